use kernel_info::param::PROC_NAME_LEN;
use kernel_vmem::AddressSpace;

/// Saved user registers exec writes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TrapFrame {
    /// User instruction pointer on return to user mode.
    pub eip: u32,
    /// User stack pointer on return to user mode.
    pub esp: u32,
}

/// The part of a process exec touches.
#[derive(Debug)]
pub struct Process<'p> {
    space: AddressSpace<'p>,
    pub tf: TrapFrame,
    name: [u8; PROC_NAME_LEN],
}

impl<'p> Process<'p> {
    pub fn new(space: AddressSpace<'p>, name: &[u8]) -> Self {
        let mut p = Self {
            space,
            tf: TrapFrame::default(),
            name: [0; PROC_NAME_LEN],
        };
        p.set_name(name);
        p
    }

    #[must_use]
    pub const fn space(&self) -> &AddressSpace<'p> {
        &self.space
    }

    /// Size of the user image in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.space.size()
    }

    /// Display name without the trailing NUL padding.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().take_while(|&&b| b != 0).count();
        &self.name[..len]
    }

    /// The raw, NUL-padded name field.
    #[must_use]
    pub const fn name_field(&self) -> &[u8; PROC_NAME_LEN] {
        &self.name
    }

    /// Copy at most `PROC_NAME_LEN - 1` bytes of `name`; the field is always
    /// NUL-terminated.
    pub fn set_name(&mut self, name: &[u8]) {
        self.name = [0; PROC_NAME_LEN];
        let n = name.len().min(PROC_NAME_LEN - 1);
        self.name[..n].copy_from_slice(&name[..n]);
    }

    /// Install `space`, handing back the previous one.
    pub(crate) const fn replace_space(&mut self, space: AddressSpace<'p>) -> AddressSpace<'p> {
        core::mem::replace(&mut self.space, space)
    }
}
