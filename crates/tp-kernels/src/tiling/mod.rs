pub mod cube;
pub mod softmax;

pub use cube::CubeTiling;
pub use softmax::SoftmaxTiling;
