//! Streaming checksums used by the DEFLATE/zlib stream formats.
//!
//! - **Adler-32** (RFC 1950): validates the uncompressed payload of a
//!   zlib stream and identifies preset dictionaries.
//! - **CRC-32 (ISO 3309)**: the checksum used by ZIP, GZIP, and PNG
//!   containers wrapping raw DEFLATE data.
//!
//! Both are incremental: feeding data in arbitrary chunks yields the
//! same value as a single update.
//!
//! CRC-32 uses the "slicing-by-16" technique for data of 16 bytes or
//! more, processing 16 bytes per iteration with 16 pre-computed lookup
//! tables, and falls back to a byte-at-a-time loop for the tail.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes that can be summed before the 32-bit accumulators
/// must be reduced (bounded by overflow analysis of s2).
const ADLER_NMAX: usize = 5552;

/// Adler-32 checksum calculator (RFC 1950).
///
/// Two accumulators: `a` is the byte sum modulo 65521 (initial value 1),
/// `b` is the running sum of `a` modulo 65521 (initial value 0). The
/// final value is `b * 65536 + a`.
///
/// # Example
///
/// ```
/// use ferroflate_core::checksum::Adler32;
///
/// let mut adler = Adler32::new();
/// adler.update(b"Hello");
/// assert_eq!(adler.value(), 0x058C01F5);
/// ```
#[derive(Debug, Clone)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.a = 1;
        self.b = 0;
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        let mut remaining = data;
        while remaining.len() >= ADLER_NMAX {
            let (chunk, rest) = remaining.split_at(ADLER_NMAX);
            remaining = rest;

            for &byte in chunk {
                a += u32::from(byte);
                b += a;
            }

            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        for &byte in remaining {
            a += u32::from(byte);
            b += a;
        }

        self.a = a % ADLER_MOD;
        self.b = b % ADLER_MOD;
    }

    /// Get the current checksum value.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute the Adler-32 checksum of a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-32 slicing-by-16 lookup tables (polynomial 0xEDB88320, reflected).
///
/// Table 0 is the classic byte-at-a-time table; table `t` advances a CRC
/// by `t` additional zero bytes.
const CRC32_TABLES: [[u32; 256]; 16] = {
    let mut tables = [[0u32; 256]; 16];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 16 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// CRC-32 calculator (ISO 3309).
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
/// - Reflected input and output
///
/// # Example
///
/// ```
/// use ferroflate_core::checksum::Crc32;
///
/// assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut c = self.crc;

        let mut chunks = data.chunks_exact(16);
        for chunk in &mut chunks {
            let lo = c ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

            c = CRC32_TABLES[15][(lo & 0xFF) as usize]
                ^ CRC32_TABLES[14][((lo >> 8) & 0xFF) as usize]
                ^ CRC32_TABLES[13][((lo >> 16) & 0xFF) as usize]
                ^ CRC32_TABLES[12][((lo >> 24) & 0xFF) as usize]
                ^ CRC32_TABLES[11][chunk[4] as usize]
                ^ CRC32_TABLES[10][chunk[5] as usize]
                ^ CRC32_TABLES[9][chunk[6] as usize]
                ^ CRC32_TABLES[8][chunk[7] as usize]
                ^ CRC32_TABLES[7][chunk[8] as usize]
                ^ CRC32_TABLES[6][chunk[9] as usize]
                ^ CRC32_TABLES[5][chunk[10] as usize]
                ^ CRC32_TABLES[4][chunk[11] as usize]
                ^ CRC32_TABLES[3][chunk[12] as usize]
                ^ CRC32_TABLES[2][chunk[13] as usize]
                ^ CRC32_TABLES[1][chunk[14] as usize]
                ^ CRC32_TABLES[0][chunk[15] as usize];
        }

        for &byte in chunks.remainder() {
            c = CRC32_TABLES[0][((c ^ u32::from(byte)) & 0xFF) as usize] ^ (c >> 8);
        }

        self.crc = c;
    }

    /// Get the current CRC value.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Compute CRC-32 for a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adler32_empty() {
        assert_eq!(Adler32::compute(&[]), 1);
    }

    #[test]
    fn test_adler32_known_values() {
        assert_eq!(Adler32::compute(b"Hello"), 0x058C01F5);
        // Wikipedia's worked example.
        assert_eq!(Adler32::compute(b"Wikipedia"), 0x11E60398);
    }

    #[test]
    fn test_adler32_incremental() {
        let data = b"Hello, World!";

        let one_shot = Adler32::compute(data);

        let mut adler = Adler32::new();
        adler.update(&data[..6]);
        adler.update(&data[6..]);
        assert_eq!(adler.value(), one_shot);
    }

    #[test]
    fn test_adler32_large() {
        // Cross the NMAX reduction boundary.
        let data = vec![0xFFu8; 3 * ADLER_NMAX + 17];
        let one_shot = Adler32::compute(&data);

        let mut adler = Adler32::new();
        for chunk in data.chunks(977) {
            adler.update(chunk);
        }
        assert_eq!(adler.value(), one_shot);
    }

    #[test]
    fn test_adler32_reset() {
        let mut adler = Adler32::new();
        adler.update(b"garbage");
        adler.reset();
        adler.update(b"Hello");
        assert_eq!(adler.value(), 0x058C01F5);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32::compute(b""), 0x00000000);
    }

    #[test]
    fn test_crc32_check_value() {
        // Standard CRC-32 check value for "123456789".
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_crc32_hello_world() {
        assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut crc = Crc32::new();
        crc.update(b"Hello");
        crc.update(b", ");
        crc.update(b"World!");
        assert_eq!(crc.value(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_table_correctness() {
        assert_eq!(CRC32_TABLES[0][0], 0x00000000);
        assert_eq!(CRC32_TABLES[0][1], 0x77073096);
        assert_eq!(CRC32_TABLES[0][255], 0x2D02EF8D);
    }

    #[test]
    fn test_crc32_slice16_matches_bytewise() {
        // Sizes around the slicing threshold and odd tails.
        for size in [1, 7, 15, 16, 17, 31, 32, 33, 64, 255, 256, 1024] {
            let data: Vec<u8> = (0..size).map(|i| (i * 31 + 7) as u8).collect();

            let sliced = Crc32::compute(&data);

            let mut bytewise = Crc32::new();
            for &byte in &data {
                bytewise.update(&[byte]);
            }

            assert_eq!(sliced, bytewise.value(), "CRC mismatch for size {}", size);
        }
    }
}
