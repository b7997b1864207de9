//! Packing of boolean values into bytes, least-significant bit first

/// number of bytes required to hold `count` packed bits
pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

/// Pack a sequence of bits into bytes.
///
/// Bits are placed LSB-first within each byte and the unused high bits of the final byte
/// are zero. The output length is always `ceil(bits.len() / 8)`.
pub fn pack(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let mut acc: u8 = 0;
            for (count, bit) in chunk.iter().enumerate() {
                if *bit {
                    acc |= 1 << count;
                }
            }
            acc
        })
        .collect()
}

/// Unpack exactly `count` bits from packed bytes, ignoring any padding bits beyond `count`.
///
/// If `data` holds fewer than `count` bits, only the available bits are returned.
pub fn unpack(data: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map_while(|pos| {
            data.get(pos / 8)
                .map(|byte| (*byte & (1 << (pos % 8))) != 0)
        })
        .collect()
}
