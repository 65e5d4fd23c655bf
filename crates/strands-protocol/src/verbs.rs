//! Verb constants - the first field of every line on the wire.

/// All protocol verbs, grouped by direction.
pub struct Verbs;

impl Verbs {
    // ── Session ─────────────────────────────────────────────────────────
    pub const HELLO: &str = "HELLO";
    pub const PING: &str = "PING";
    pub const PONG: &str = "PONG";

    // ── Rooms ───────────────────────────────────────────────────────────
    pub const NEW_ROOM: &str = "NEWROOM";
    pub const ROOMS: &str = "ROOMS";
    pub const ROOM: &str = "ROOM";
    pub const JOIN: &str = "JOIN";
    pub const LEAVE: &str = "LEAVE";
    /// Listing placeholder for a room without a name.
    pub const NO_NAME: &str = "NONE";
    /// Listing marker for a password-protected room.
    pub const PASSWORD: &str = "PASSWORD";

    // ── Board state ─────────────────────────────────────────────────────
    pub const SET_BOARD: &str = "SETBOARD";
    pub const BOARD: &str = "BOARD";
    pub const GET_STATE: &str = "GETSTATE";
    pub const HOST_STATE: &str = "HOSTSTATE";

    // ── Gameplay ────────────────────────────────────────────────────────
    pub const GUESS: &str = "GUESS";
    pub const END_GUESS: &str = "ENDGUESS";
    pub const HINT: &str = "HINT";
    pub const FORWARD: &str = "FORWARD";

    // ── Board cache ─────────────────────────────────────────────────────
    pub const DOWNLOAD_BOARD: &str = "DLBOARD";
    pub const BOARD_SUMMARIES: &str = "BOARDSUMMARIES";
    pub const BOARD_SUMMARY: &str = "BOARDSUMMARY";

    // ── Acks ────────────────────────────────────────────────────────────
    pub const COOL: &str = "COOL";
    pub const NO: &str = "NO";
    pub const INVALID: &str = "INVALID";
    pub const START: &str = "START";
    pub const END: &str = "END";

    // ── Relay events ────────────────────────────────────────────────────
    pub const NEW_HOST: &str = "NEWHOST";
    pub const JOINED: &str = "JOINED";
    pub const LEFT: &str = "LEFT";
}

