/// Rounds `value` up to the next multiple of `to`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use freelist::align;
///
/// assert_eq!(align!(13, 16), 16);
/// assert_eq!(align!(32, 16), 32);
/// assert_eq!(align!(0, 16), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}
