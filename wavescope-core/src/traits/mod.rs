pub mod capture_delegate;
pub mod device_provider;
pub mod sample_transform;
