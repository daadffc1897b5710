use std::future::Future;
use std::pin::Pin;

pub mod crypto;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Number of digits of `n` in lowercase hexadecimal, at least one
pub const fn hex_len(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    (usize::BITS - n.leading_zeros()).div_ceil(4) as usize
}
