#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Version,
    MachineId,
    SortKey,
    Linux,
    Initrd,
    Efi,
    Options,
    Devicetree,
    DevicetreeOverlay,
    Architecture,
}

/// How two entries are compared on one field when deciding whether they are the same boot option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Ignored,
    Literal,
    /// The values name payload files; compare the sets of their content digests.
    DigestSet,
}

impl Field {
    /// Every descriptor field, in the order they are written to disk.
    pub const ALL: [Field; 11] = [
        Field::Title,
        Field::Version,
        Field::MachineId,
        Field::SortKey,
        Field::Linux,
        Field::Initrd,
        Field::Efi,
        Field::Options,
        Field::Devicetree,
        Field::DevicetreeOverlay,
        Field::Architecture,
    ];

    pub const PAYLOAD: [Field; 3] = [Field::Linux, Field::Initrd, Field::Efi];

    pub fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Version => "version",
            Self::MachineId => "machine_id",
            Self::SortKey => "sort_key",
            Self::Linux => "linux",
            Self::Initrd => "initrd",
            Self::Efi => "efi",
            Self::Options => "options",
            Self::Devicetree => "devicetree",
            Self::DevicetreeOverlay => "devicetree_overlay",
            Self::Architecture => "architecture",
        }
    }

    pub fn disk_key(self) -> &'static str {
        match self {
            Self::MachineId => "machine-id",
            Self::SortKey => "sort-key",
            Self::DevicetreeOverlay => "devicetree-overlay",
            other => other.key(),
        }
    }

    /// Accepts both the underscore and the hyphenated spelling.
    pub fn from_key(key: &str) -> Option<Field> {
        Self::ALL
            .into_iter()
            .find(|field| field.key() == key || field.disk_key() == key)
    }

    pub fn comparison(self) -> Comparison {
        match self {
            Self::Title | Self::Version => Comparison::Ignored,
            Self::Linux | Self::Initrd | Self::Efi => Comparison::DigestSet,
            _ => Comparison::Literal,
        }
    }

    pub fn is_payload(self) -> bool {
        self.comparison() == Comparison::DigestSet
    }
}
