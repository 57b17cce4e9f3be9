//! Signal measurement record.

use crate::{FrequencyHz, ReceiverId, Timestamp};

/// One receiver's observation of a signal at a nominal frequency.
///
/// Immutable once created except [`tdoa`][Self::tdoa], which the
/// TDoA-computation step fills in relative to a chosen reference measurement.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalMeasurement {
    pub receiver_id: ReceiverId,
    pub frequency:   FrequencyHz,
    /// Normalized received power in `[0, 1]`.
    pub power:       f64,
    /// Signal arrival time at the receiver.
    pub timestamp:   Timestamp,
    /// Time Difference of Arrival relative to the reference receiver, seconds.
    pub tdoa:        Option<f64>,
    /// Signal-to-noise ratio in dB, when the receiver reports one.
    pub snr:         Option<f64>,
    /// Modulation label from an external classifier, if any.
    pub modulation:  Option<String>,
}

impl SignalMeasurement {
    /// A measurement with no TDoA, SNR, or modulation annotation.
    pub fn new(
        receiver_id: ReceiverId,
        frequency:   FrequencyHz,
        power:       f64,
        timestamp:   Timestamp,
    ) -> Self {
        Self {
            receiver_id,
            frequency,
            power,
            timestamp,
            tdoa: None,
            snr: None,
            modulation: None,
        }
    }
}
