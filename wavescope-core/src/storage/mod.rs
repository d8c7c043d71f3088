pub mod metadata;
pub mod recorder;
pub mod wav_writer;
