mod synthetic;

pub use synthetic::SyntheticCamera;
