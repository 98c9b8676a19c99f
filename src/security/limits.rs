/// Size validator for request heads and bodies
#[derive(Debug, Clone, Copy)]
pub struct SizeValidator {
    max_size: usize,
}

impl SizeValidator {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn validate_size(&self, size: usize) -> Result<(), SizeError> {
        if size > self.max_size {
            Err(SizeError::TooLarge {
                actual: size,
                max: self.max_size,
            })
        } else {
            Ok(())
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    #[error("{actual} bytes, maximum allowed: {max} bytes")]
    TooLarge { actual: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_validator() {
        let validator = SizeValidator::new(100);

        assert!(validator.validate_size(50).is_ok());
        assert!(validator.validate_size(100).is_ok());
        assert_eq!(
            validator.validate_size(101),
            Err(SizeError::TooLarge {
                actual: 101,
                max: 100
            })
        );
        assert_eq!(validator.max_size(), 100);
    }

    #[test]
    fn test_size_error_message() {
        let err = SizeValidator::new(8).validate_size(9).unwrap_err();
        assert_eq!(err.to_string(), "9 bytes, maximum allowed: 8 bytes");
    }
}
