use crate::error::UldaError;

pub trait SecureRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), UldaError>;

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, UldaError> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf)?;
        Ok(buf)
    }
}
