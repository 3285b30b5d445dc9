//! Constants used in the integration tests

/// The default host of the devnet node, an Anvil instance
pub(crate) const DEFAULT_DEVNET_HOST: &str = "127.0.0.1";

/// The default port of the devnet node
pub(crate) const DEFAULT_DEVNET_PORT: u16 = 8545;

/// The default private key, the first default account in an Anvil node
pub(crate) const DEFAULT_DEVNET_PKEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// The name of the network the tests declare
pub(crate) const DEVNET_NETWORK_NAME: &str = "devnet";

/// Creation code for a contract whose runtime code returns the word 42
pub(crate) const ANSWER_CREATION_CODE: &str = "0x600a600c600039600a6000f3602a60005260206000f3";

/// The runtime code installed by [`ANSWER_CREATION_CODE`]
pub(crate) const ANSWER_RUNTIME_CODE: &str = "0x602a60005260206000f3";

/// The compiler version the test artifacts claim to be built with
pub(crate) const TEST_COMPILER_VERSION: &str = "0.8.11";
