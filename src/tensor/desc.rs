use crate::utils::error::{PaginatedError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    dims: Vec<usize>,
}

impl TensorDesc {
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(PaginatedError::InvalidConfig {
                message: "Tensor dimensions cannot be empty".to_string(),
            });
        }
        Ok(Self { dims })
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    // Get dimensions
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    // Get number of dimensions
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }
}
