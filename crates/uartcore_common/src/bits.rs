/// XOR-reduction of all bits in `value`.
///
/// This is the parity bit the transmitter appends and the receiver checks
/// against: `true` when `value` has an odd number of set bits, so that data
/// plus parity always carries an even number of ones.
#[inline]
pub const fn xor_reduce(value: u8) -> bool {
    value.count_ones() & 1 == 1
}

/// Line level of bit `index` of `value` (0 = LSB, sent first).
#[inline]
pub const fn bit(value: u8, index: u8) -> bool {
    (value >> index) & 1 == 1
}
