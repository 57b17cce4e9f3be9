//! Derivative-free minimization over `(lat, lon, alt)`.
//!
//! The TDoA/RSSI cost surfaces are smooth but their gradients are awkward to
//! derive through the haversine, so a Nelder–Mead simplex does the work.
//! Latitude/longitude are in degrees and altitude in metres — wildly
//! different scales — so the initial simplex and the convergence test are
//! both expressed per-axis relative to `initial_step`.

use nalgebra::Vector3;
use tracing::debug;

/// Nelder–Mead simplex minimizer.
///
/// Reports success explicitly: [`minimize`][Self::minimize] returns `None`
/// when the simplex has not collapsed within `max_iterations`, never a
/// silently poor fit.
#[derive(Clone, Debug)]
pub struct NelderMead {
    /// Iteration budget before giving up.
    pub max_iterations: usize,
    /// Per-axis convergence threshold as a fraction of `initial_step`.
    pub tolerance: f64,
    /// Per-axis size of the initial simplex: degrees, degrees, metres.
    pub initial_step: Vector3<f64>,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-7,
            // ~1 km in latitude/longitude, 10 m in altitude.
            initial_step: Vector3::new(0.01, 0.01, 10.0),
        }
    }
}

// Standard Nelder–Mead coefficients.
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimize `cost` starting from `start`.
    ///
    /// Returns the best vertex once the simplex has collapsed below the
    /// per-axis tolerance, or `None` on non-convergence.
    pub fn minimize<F>(&self, cost: F, start: Vector3<f64>) -> Option<Vector3<f64>>
    where
        F: Fn(Vector3<f64>) -> f64,
    {
        // Initial simplex: start plus one vertex per axis.
        let mut vertices: Vec<(Vector3<f64>, f64)> = Vec::with_capacity(4);
        vertices.push((start, cost(start)));
        for axis in 0..3 {
            let mut v = start;
            v[axis] += self.initial_step[axis];
            vertices.push((v, cost(v)));
        }

        for iteration in 0..self.max_iterations {
            vertices.sort_by(|a, b| a.1.total_cmp(&b.1));

            if self.converged(&vertices) {
                debug!(iteration, cost = vertices[0].1, "simplex converged");
                return Some(vertices[0].0);
            }

            let worst = vertices[3];
            let centroid: Vector3<f64> =
                (vertices[0].0 + vertices[1].0 + vertices[2].0) / 3.0;

            // Reflection.
            let reflected = centroid + REFLECT * (centroid - worst.0);
            let f_reflected = cost(reflected);

            if f_reflected < vertices[0].1 {
                // Expansion.
                let expanded = centroid + EXPAND * (reflected - centroid);
                let f_expanded = cost(expanded);
                vertices[3] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < vertices[2].1 {
                vertices[3] = (reflected, f_reflected);
                continue;
            }

            // Contraction toward the better of worst/reflected.
            let (toward, f_toward) = if f_reflected < worst.1 {
                (reflected, f_reflected)
            } else {
                (worst.0, worst.1)
            };
            let contracted = centroid + CONTRACT * (toward - centroid);
            let f_contracted = cost(contracted);

            if f_contracted < f_toward {
                vertices[3] = (contracted, f_contracted);
                continue;
            }

            // Shrink toward the best vertex.
            let best = vertices[0].0;
            for vertex in vertices.iter_mut().skip(1) {
                vertex.0 = best + SHRINK * (vertex.0 - best);
                vertex.1 = cost(vertex.0);
            }
        }

        debug!(max_iterations = self.max_iterations, "simplex failed to converge");
        None
    }

    /// Per-axis spread of the simplex, relative to the initial step.
    fn converged(&self, vertices: &[(Vector3<f64>, f64)]) -> bool {
        for axis in 0..3 {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for (v, _) in vertices {
                lo = lo.min(v[axis]);
                hi = hi.max(v[axis]);
            }
            if hi - lo > self.initial_step[axis] * self.tolerance {
                return false;
            }
        }
        true
    }
}
