// Purpose - external interfaces, format conversions

pub mod sample;

pub use sample::OutputSample;
