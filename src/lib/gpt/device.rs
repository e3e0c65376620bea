use crate::Result;

/// Byte-addressed random access to a disk image.
///
/// Implemented for every `std::io::Read + Seek` when the `std` feature is
/// on; bare-metal callers implement `seek` and `read` over their driver.
pub trait BlockDevice {
    fn seek(&mut self, offset: u64) -> Result<u64>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fills as much of `buf` as the device holds past `offset`. Returns
    /// the number of bytes read, which is short only at end of device.
    fn read_at(&mut self, offset: u64, mut buf: &mut [u8]) -> Result<usize> {
        self.seek(offset)?;
        let mut total = 0;
        while !buf.is_empty() {
            match self.read(buf)? {
                0 => break,
                n => {
                    total += n;
                    let tmp = buf;
                    buf = &mut tmp[n..];
                }
            }
        }
        Ok(total)
    }
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Seek> BlockDevice for T {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        std::io::Seek::seek(self, std::io::SeekFrom::Start(offset)).map_err(device_error)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match std::io::Read::read(self, buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                r => return r.map_err(device_error),
            }
        }
    }
}

#[cfg(feature = "std")]
fn device_error(e: std::io::Error) -> crate::Error {
    use alloc::string::ToString;
    crate::Error::Device(e.to_string())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use alloc::vec;
    use std::io::Cursor;

    #[test]
    fn read_at_seeks_then_fills() -> Result<()> {
        let mut dev = Cursor::new((0u8..=255).collect::<alloc::vec::Vec<u8>>());
        let mut buf = [0u8; 4];
        assert_eq!(dev.read_at(10, &mut buf)?, 4);
        assert_eq!(buf, [10, 11, 12, 13]);
        Ok(())
    }

    #[test]
    fn read_at_is_short_at_end() -> Result<()> {
        let mut dev = Cursor::new(vec![7u8; 100]);
        let mut buf = [0u8; 64];
        assert_eq!(dev.read_at(80, &mut buf)?, 20);
        assert_eq!(dev.read_at(500, &mut buf)?, 0);
        Ok(())
    }

    /// Hands out one byte per call.
    struct Trickle(alloc::vec::Vec<u8>, usize);

    impl BlockDevice for Trickle {
        fn seek(&mut self, offset: u64) -> Result<u64> {
            self.1 = offset as usize;
            Ok(offset)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.0.get(self.1) {
                Some(&b) if !buf.is_empty() => {
                    buf[0] = b;
                    self.1 += 1;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn read_at_loops_over_partial_reads() -> Result<()> {
        let mut dev = Trickle(vec![1, 2, 3, 4, 5], 0);
        let mut buf = [0u8; 3];
        assert_eq!(dev.read_at(1, &mut buf)?, 3);
        assert_eq!(buf, [2, 3, 4]);
        Ok(())
    }
}
