//! Bridge drive symbols and their packed representations

/// One bridge drive decision (2 bits on the wire)
///
/// | Bits | Bridge B+ | Bridge B- | Result           |
/// |------|-----------|-----------|------------------|
/// | 00   | 0         | 0         | no drive / dead time |
/// | 01   | 1         | 0         | positive drive   |
/// | 10   | 0         | 1         | negative drive   |
/// | 11   | 1         | 1         | shoot-through (never emitted) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// No voltage applied
    Neutral,
    /// Positive bridge drive
    Positive,
    /// Negative bridge drive
    Negative,
}

impl Symbol {
    /// Wire encoding of the symbol
    pub const fn bits(self) -> u32 {
        match self {
            Symbol::Neutral => 0b00,
            Symbol::Positive => 0b01,
            Symbol::Negative => 0b10,
        }
    }

    /// Decode two wire bits. `0b11` is illegal and yields `None`.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0b11 {
            0b00 => Some(Symbol::Neutral),
            0b01 => Some(Symbol::Positive),
            0b10 => Some(Symbol::Negative),
            _ => None,
        }
    }

    /// Signed output level: +1, 0 or -1
    pub const fn level(self) -> i32 {
        match self {
            Symbol::Neutral => 0,
            Symbol::Positive => 1,
            Symbol::Negative => -1,
        }
    }
}

/// Number of symbols packed into one 32-bit bridge word
pub const SYMBOLS_PER_WORD: usize = 16;

/// Output of one modulator call for one channel: 32 symbols
///
/// `high` is emitted to the bridge first. Within each word the first symbol
/// occupies the two most significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Codeword {
    pub high: u32,
    pub low: u32,
}

impl Codeword {
    /// Number of symbols in a codeword
    pub const SYMBOLS: usize = 2 * SYMBOLS_PER_WORD;

    /// Iterate symbols in emission order
    ///
    /// Illegal bit pairs decode to `None`.
    pub fn symbols(&self) -> impl Iterator<Item = Option<Symbol>> + '_ {
        [self.high, self.low]
            .into_iter()
            .flat_map(word_symbols)
    }

    /// Sum of symbol levels (positives minus negatives)
    pub fn balance(&self) -> i32 {
        self.symbols().flatten().map(Symbol::level).sum()
    }

    /// `true` if no symbol drives both bridge halves at once
    pub fn is_legal(&self) -> bool {
        self.symbols().all(|symbol| symbol.is_some())
    }
}

/// Decode the 16 symbols of one bridge word, MSB first
pub fn word_symbols(word: u32) -> impl Iterator<Item = Option<Symbol>> {
    (0..SYMBOLS_PER_WORD).map(move |i| {
        let shift = 2 * (SYMBOLS_PER_WORD - 1 - i);
        Symbol::from_bits(word >> shift)
    })
}

/// One 32-bit bridge word per channel, as delivered to the output queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BridgeFrame {
    pub left: u32,
    pub right: u32,
}

impl BridgeFrame {
    /// Split a pair of channel codewords into the two frames they occupy on
    /// the wire, in emission order.
    pub fn from_codewords(left: Codeword, right: Codeword) -> [BridgeFrame; 2] {
        [
            BridgeFrame {
                left: left.high,
                right: right.high,
            },
            BridgeFrame {
                left: left.low,
                right: right.low,
            },
        ]
    }

    /// Hardware queue packing: left in the low 32 bits, right in the high 32 bits
    pub const fn pack(self) -> u64 {
        ((self.right as u64) << 32) | self.left as u64
    }

    pub const fn unpack(word: u64) -> Self {
        Self {
            left: word as u32,
            right: (word >> 32) as u32,
        }
    }
}
