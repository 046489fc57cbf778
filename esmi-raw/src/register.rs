//! Generic layout abstraction for packed hardware words
//!
//! Both the 64-bit model-specific registers and the 32-bit HSMP mailbox
//! response words pack several fields into one integer. Each such word is
//! described by a plain struct implementing [`RegisterLayout`], so decoding
//! stays a pure function that can be tested against literal packed values.

/// Trait for layouts that can be converted to/from a raw packed word
///
/// # Example
///
/// ```
/// use esmi_raw::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct Range {
///     max: u8,
///     min: u8,
/// }
///
/// impl RegisterLayout for Range {
///     type Raw = u32;
///
///     fn to_raw(&self) -> u32 {
///         ((self.max as u32) << 8) | self.min as u32
///     }
///
///     fn from_raw(value: u32) -> Self {
///         Self {
///             max: ((value >> 8) & 0xFF) as u8,
///             min: (value & 0xFF) as u8,
///         }
///     }
/// }
///
/// assert_eq!(Range::from_raw(0x0201).max, 2);
/// ```
pub trait RegisterLayout: Sized {
    /// Width of the packed word (`u32` for mailbox words, `u64` for MSRs)
    type Raw: Copy;

    /// Pack this layout into its raw word
    fn to_raw(&self) -> Self::Raw;

    /// Unpack a raw word into this layout
    fn from_raw(value: Self::Raw) -> Self;

    /// Validate that the field values fit their bit ranges
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}
