mod layer;
mod read;

pub use layer::Layer;
