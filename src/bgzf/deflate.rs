//! Raw DEFLATE compress/decompress bindings used by the BGZF block codec.
//!
//! [libdeflater](https://crates.io/crates/libdeflater) or
//! [flate2](https://crates.io/crates/flate2) provide the actual codec,
//! selected by feature flag exactly as in the upstream `bgzip` crate this
//! module is adapted from.

use crate::error::SeqioError;

#[cfg(not(feature = "libdeflater"))]
use flate2::Status;

#[cfg(not(feature = "libdeflater"))]
pub use flate2::Crc;

#[cfg(feature = "libdeflater")]
pub use libdeflater::Crc;

/// Compression level.
#[cfg(not(feature = "libdeflater"))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Compression(flate2::Compression);

#[cfg(feature = "libdeflater")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression(libdeflater::CompressionLvl);

#[cfg(not(feature = "libdeflater"))]
impl Compression {
    pub const fn best() -> Self {
        Compression(flate2::Compression::best())
    }

    pub const fn fast() -> Self {
        Compression(flate2::Compression::fast())
    }
}

#[cfg(feature = "libdeflater")]
impl Compression {
    pub fn best() -> Self {
        Compression(libdeflater::CompressionLvl::best())
    }

    pub fn fast() -> Self {
        Compression(libdeflater::CompressionLvl::fastest())
    }
}

#[cfg(feature = "libdeflater")]
impl Default for Compression {
    fn default() -> Self {
        Compression(libdeflater::CompressionLvl::default())
    }
}

/// flate2-based compressor.
#[cfg(not(feature = "libdeflater"))]
#[derive(Debug)]
pub struct Compress(flate2::Compress);

#[cfg(not(feature = "libdeflater"))]
impl Compress {
    pub fn new(level: Compression) -> Self {
        Compress(flate2::Compress::new(level.0, false))
    }

    pub fn compress(
        &mut self,
        original_data: &[u8],
        compressed_data: &mut [u8],
    ) -> Result<usize, SeqioError> {
        self.0.reset();
        let status = self
            .0
            .compress(
                original_data,
                compressed_data,
                flate2::FlushCompress::Finish,
            )
            .map_err(|_| SeqioError::Encoding("deflate compression failed"))?;
        match status {
            flate2::Status::StreamEnd => Ok(self.0.total_out() as usize),
            flate2::Status::Ok | flate2::Status::BufError => {
                Err(SeqioError::Encoding("insufficient compress buffer space"))
            }
        }
    }
}

/// libdeflater-based compressor.
#[cfg(feature = "libdeflater")]
pub struct Compress(libdeflater::Compressor);

#[cfg(feature = "libdeflater")]
impl Compress {
    pub fn new(level: Compression) -> Self {
        Compress(libdeflater::Compressor::new(level.0))
    }

    pub fn compress(
        &mut self,
        original_data: &[u8],
        compressed_data: &mut [u8],
    ) -> Result<usize, SeqioError> {
        self.0
            .deflate_compress(original_data, compressed_data)
            .map_err(|_| SeqioError::Encoding("insufficient compress buffer space"))
    }
}

/// flate2-based decompressor.
#[cfg(not(feature = "libdeflater"))]
#[derive(Debug)]
pub struct Decompress(flate2::Decompress);

#[cfg(not(feature = "libdeflater"))]
impl Decompress {
    pub fn new() -> Self {
        Decompress(flate2::Decompress::new(false))
    }

    pub fn decompress(
        &mut self,
        compressed_data: &[u8],
        decompressed_data: &mut [u8],
    ) -> Result<usize, SeqioError> {
        self.0.reset(false);
        match self
            .0
            .decompress(
                compressed_data,
                decompressed_data,
                flate2::FlushDecompress::Finish,
            )
            .map_err(|_| SeqioError::BadBlock("deflate decompression failed"))?
        {
            Status::StreamEnd => Ok(self.0.total_out() as usize),
            Status::Ok | Status::BufError => {
                Err(SeqioError::BadBlock("insufficient decompress buffer space"))
            }
        }
    }
}

#[cfg(not(feature = "libdeflater"))]
impl Default for Decompress {
    fn default() -> Self {
        Self::new()
    }
}

/// libdeflater-based decompressor.
#[cfg(feature = "libdeflater")]
pub struct Decompress(libdeflater::Decompressor);

#[cfg(feature = "libdeflater")]
impl Decompress {
    pub fn new() -> Self {
        Decompress(libdeflater::Decompressor::new())
    }

    pub fn decompress(
        &mut self,
        compressed_data: &[u8],
        decompressed_data: &mut [u8],
    ) -> Result<usize, SeqioError> {
        self.0
            .deflate_decompress(compressed_data, decompressed_data)
            .map_err(|_| SeqioError::BadBlock("deflate decompression failed"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    const BUF_SIZE: usize = 3000;

    #[test]
    fn round_trips_random_data() -> anyhow::Result<()> {
        let mut rand = rand_pcg::Pcg64Mcg::seed_from_u64(0x3874_aef4_5615_7523);
        let mut original_data = vec![0; BUF_SIZE];
        rand.fill_bytes(&mut original_data);

        let mut compress = Compress::new(Compression::default());
        let mut deflated_data = vec![0; BUF_SIZE + 500];
        let deflate_size = compress.compress(&original_data, &mut deflated_data)?;

        let mut decompress = Decompress::new();
        let mut inflated_data = vec![0; BUF_SIZE];
        let inflate_size =
            decompress.decompress(&deflated_data[..deflate_size], &mut inflated_data)?;

        assert_eq!(inflate_size, original_data.len());
        assert_eq!(inflated_data, original_data);
        Ok(())
    }

    #[test]
    fn reports_insufficient_space() {
        let mut rand = rand_pcg::Pcg64Mcg::seed_from_u64(0x1234);
        let mut original_data = vec![0; BUF_SIZE];
        rand.fill_bytes(&mut original_data);
        let mut compress = Compress::new(Compression::default());
        let mut small_buf = [0u8; 8];
        assert!(compress.compress(&original_data, &mut small_buf).is_err());
    }
}
