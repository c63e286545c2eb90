//! Shape-then-fetch marshaling of decoder buffers.
//!
//! Callers resolve the dimensions first (fresh count queries), then ask for the contents
//! here. The buffer is allocated zeroed with exactly the declared size and filled in one
//! decoder call; a decoder that reports holding a different number of elements is rejected
//! with [`HessioError::ContractViolation`] and nothing is returned.

use crate::error::{HessioError, Result};
use crate::status::Query;
use crate::types::Grid;

/// Fetches a flat buffer of `len` elements.
pub(crate) fn fetch_vec<T, F>(query: Query, len: usize, fill: F) -> Result<Vec<T>>
where
    T: Copy + Default,
    F: FnOnce(&mut [T]) -> i32,
{
    let mut buffer = vec![T::default(); len];
    let written = query.check(fill(&mut buffer))?;
    check_written(&query, len, written)?;
    Ok(buffer)
}

/// Fetches two parallel buffers of `len` elements each, filled by a single call.
pub(crate) fn fetch_pair<T, F>(query: Query, len: usize, fill: F) -> Result<(Vec<T>, Vec<T>)>
where
    T: Copy + Default,
    F: FnOnce(&mut [T], &mut [T]) -> i32,
{
    let mut first = vec![T::default(); len];
    let mut second = vec![T::default(); len];
    let written = query.check(fill(&mut first, &mut second))?;
    check_written(&query, len, written)?;
    Ok((first, second))
}

/// Fetches a `rows × cols` grid.
pub(crate) fn fetch_grid<T, F>(query: Query, rows: usize, cols: usize, fill: F) -> Result<Grid<T>>
where
    T: Copy + Default,
    F: FnOnce(&mut [T]) -> i32,
{
    let len = grid_len(&query, rows, cols)?;
    let data = fetch_vec(query, len, fill)?;
    into_grid(&query, rows, cols, data)
}

/// Fetches two parallel `rows × cols` grids filled by a single call.
pub(crate) fn fetch_grid_pair<T, F>(
    query: Query,
    rows: usize,
    cols: usize,
    fill: F,
) -> Result<(Grid<T>, Grid<T>)>
where
    T: Copy + Default,
    F: FnOnce(&mut [T], &mut [T]) -> i32,
{
    let len = grid_len(&query, rows, cols)?;
    let (first, second) = fetch_pair(query, len, fill)?;
    Ok((
        into_grid(&query, rows, cols, first)?,
        into_grid(&query, rows, cols, second)?,
    ))
}

/// Fetches a scalar out-parameter.
pub(crate) fn fetch_scalar<T, F>(query: Query, fill: F) -> Result<T>
where
    T: Default,
    F: FnOnce(&mut T) -> i32,
{
    let mut value = T::default();
    query.check(fill(&mut value))?;
    Ok(value)
}

fn check_written(query: &Query, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(HessioError::ContractViolation {
            what: query.what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn grid_len(query: &Query, rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or(HessioError::ContractViolation {
            what: query.what,
            expected: usize::MAX,
            actual: rows,
        })
}

fn into_grid<T>(query: &Query, rows: usize, cols: usize, data: Vec<T>) -> Result<Grid<T>> {
    let len = data.len();
    Grid::from_vec(rows, cols, data).ok_or(HessioError::ContractViolation {
        what: query.what,
        expected: rows * cols,
        actual: len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{GENERAL_FAILURE, TELESCOPE_INDEX_NOT_VALID};
    use crate::types::TelescopeId;

    fn query() -> Query {
        Query::telescope("pixel timing", TelescopeId::new(47))
    }

    #[test]
    fn test_fetch_grid_fills_row_major() {
        let grid: Grid<f32> = fetch_grid(query(), 2, 3, |out| {
            for (i, v) in out.iter_mut().enumerate() {
                *v = i as f32;
            }
            out.len() as i32
        })
        .unwrap();
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.row(1), Some(&[3.0, 4.0, 5.0][..]));
    }

    #[test]
    fn test_buffer_is_sized_before_the_call() {
        let mut seen = 0;
        let _: Vec<u16> = fetch_vec(query(), 2048 * 25, |out| {
            seen = out.len();
            out.len() as i32
        })
        .unwrap();
        assert_eq!(seen, 2048 * 25);
    }

    #[test]
    fn test_size_mismatch_is_contract_violation() {
        let err = fetch_vec::<i32, _>(query(), 10, |_| 12).unwrap_err();
        assert_eq!(
            err,
            HessioError::ContractViolation {
                what: "pixel timing",
                expected: 10,
                actual: 12
            }
        );
    }

    #[test]
    fn test_status_is_translated_before_size_check() {
        let err = fetch_vec::<i32, _>(query(), 10, |_| TELESCOPE_INDEX_NOT_VALID).unwrap_err();
        assert_eq!(
            err,
            HessioError::TelescopeIndexNotValid {
                telescope: TelescopeId::new(47)
            }
        );

        let err = fetch_scalar::<f64, _>(query(), |_| GENERAL_FAILURE).unwrap_err();
        assert!(matches!(err, HessioError::Unavailable { .. }));
    }

    #[test]
    fn test_fetch_grid_pair() {
        let (a, b): (Grid<f64>, Grid<f64>) = fetch_grid_pair(query(), 2, 2, |x, y| {
            x.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
            y.copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);
            4
        })
        .unwrap();
        assert_eq!(a.get(1, 0), Some(&3.0));
        assert_eq!(b.get(0, 1), Some(&6.0));
    }

    #[test]
    fn test_empty_shape_is_allowed() {
        let grid: Grid<u16> = fetch_grid(query(), 0, 25, |out| out.len() as i32).unwrap();
        assert!(grid.is_empty());
    }
}
