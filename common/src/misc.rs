
// Replicate bit `bits - 1` of `val` into the upper bits.
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    assert!(bits > 0 && bits <= u16::BITS);
    let shift = u16::BITS - bits;
    (((val << shift) as i16) >> shift) as u16
}

pub fn field_mask(bits: u32) -> u16 {
    ((1u32 << bits) - 1) as u16
}
