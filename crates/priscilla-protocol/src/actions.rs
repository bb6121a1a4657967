// Well-known command actions and flags. Anything else in `command.action`
// is application-defined and routed opaquely.

// handshake
pub const ENGAGE: &str = "engage";
pub const PROCEED: &str = "proceed";
pub const TERMINATE: &str = "terminate";
pub const DISENGAGE: &str = "disengage";

// responder registration
pub const REGISTER: &str = "register";

// the only command an adapter may address to a specific responder
pub const INFO: &str = "info";

// engage `command.type` marking the client as a chat adapter
pub const CLIENT_ADAPTER: &str = "adapter";

// register `command.type` classifications
pub const CLASS_PREFIX: &str = "prefix";
pub const CLASS_NOPREFIX: &str = "noprefix";
pub const CLASS_MENTION: &str = "mention";
pub const CLASS_UNHANDLED: &str = "unhandled";

// register `command.options` flags
pub const OPTION_FALLTHROUGH: &str = "fallthrough";
