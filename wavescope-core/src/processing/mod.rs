pub mod low_pass;
pub mod pcm;
pub mod slot;
pub mod wav_format;
