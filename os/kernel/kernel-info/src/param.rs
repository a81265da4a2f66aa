//! # Kernel Parameters

/// Maximum number of arguments accepted by `exec`.
pub const MAXARG: usize = 32;

/// Size of the process display-name buffer, including the terminating NUL.
pub const PROC_NAME_LEN: usize = 16;

/// Pages of user stack established by `exec`.
pub const USER_STACK_PAGES: u32 = 1;

/// Inaccessible pages placed directly below the user stack.
pub const STACK_GUARD_PAGES: u32 = 1;

/// Fake return address at the bottom of the initial user stack frame.
pub const STACK_SENTINEL: u32 = 0xFFFF_FFFF;

const _: () = {
    assert!(MAXARG > 0);
    assert!(PROC_NAME_LEN > 1);
    assert!(USER_STACK_PAGES > 0);
};
