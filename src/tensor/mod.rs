mod desc;
pub use desc::TensorDesc;
mod fill;
pub use fill::FillReport;
mod tensor;
pub use tensor::Tensor;
