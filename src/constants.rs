//! Supply and derivation bounds, defaults

/// Maximum money supply: 21,000,000 BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// First hardened child number: 2^31
pub const HARDENED_INDEX_BOUND: u32 = 0x8000_0000;

/// Default Electrum endpoint
pub const DEFAULT_ELECTRUM_URI: &str = "ssl://blockstream.info:700";

/// Default descriptor: change chain of the BIP-44 account of the
/// "abandon ... about" test mnemonic
pub const DEFAULT_DESCRIPTOR: &str = "pkh(xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/1/*)";

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "WALLET_VIEW";
