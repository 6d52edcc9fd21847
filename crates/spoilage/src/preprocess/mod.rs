//! Preprocessing artifacts fitted at training time and reused at inference.
//!
//! - [`StandardScaler`] / [`ScalerState`]: per-column standardization
//! - [`LabelCodec`]: label ↔ class id mapping

mod codec;
mod scaler;

pub use codec::{CodecError, LabelCodec};
pub use scaler::{ScalerError, ScalerState, StandardScaler};
