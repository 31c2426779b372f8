//! Count-then-fill enumeration helper
//!
//! Sysman enumerations take `count: &mut u32` and an optional output
//! buffer. With no buffer the driver stores the number of entries in
//! `count`; with a buffer it writes up to `*count` entries and updates
//! `count` to the number written.

use crate::error::ZeResult;

/// Run the two-call convention and collect the entries
///
/// # Examples
///
/// ```
/// use zesctl::sysman::enumerate;
///
/// let clocks = enumerate(|count: &mut u32, buf: Option<&mut [f64]>| {
///     match buf {
///         None => *count = 2,
///         Some(buf) => {
///             buf.copy_from_slice(&[300.0, 1200.0][..buf.len()]);
///             *count = buf.len() as u32;
///         }
///     }
///     Ok(())
/// })
/// .unwrap();
///
/// assert_eq!(clocks, vec![300.0, 1200.0]);
/// ```
pub fn enumerate<T, F>(mut call: F) -> ZeResult<Vec<T>>
where
    T: Clone + Default,
    F: FnMut(&mut u32, Option<&mut [T]>) -> ZeResult<()>,
{
    let mut count = 0u32;
    call(&mut count, None)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut items = vec![T::default(); count as usize];
    call(&mut count, Some(&mut items))?;

    // The driver may report fewer entries on the second call
    items.truncate(count as usize);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZesError;

    #[test]
    fn test_enumerate_empty() {
        let items: Vec<u32> = enumerate(|count: &mut u32, _buf: Option<&mut [u32]>| {
            *count = 0;
            Ok(())
        })
        .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_enumerate_truncates_to_second_count() {
        let mut calls = 0;
        let items = enumerate(|count: &mut u32, buf: Option<&mut [u32]>| {
            calls += 1;
            match buf {
                None => *count = 4,
                Some(buf) => {
                    buf[0] = 7;
                    buf[1] = 9;
                    *count = 2;
                }
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(items, vec![7, 9]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_enumerate_propagates_error() {
        let result: ZeResult<Vec<u32>> =
            enumerate(|_count: &mut u32, _buf: Option<&mut [u32]>| Err(ZesError::DeviceLost));
        assert_eq!(result, Err(ZesError::DeviceLost));
    }
}
