//! Image preparation, model output decoding and drawing

pub mod annotate;
pub mod postprocess;
pub mod preprocess;

pub use annotate::{annotate, encode_png};
pub use postprocess::{decode_output, non_max_suppression, DecodeParams};
pub use preprocess::{letterbox, Letterbox};
