use super::*;
use lifeboat_fs::{FileOps, RootContext};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

fn scratch_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "lifeboat-core-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create scratch dir");
    path
}

fn path_string(path: &Path) -> String {
    path.to_str().expect("scratch paths are utf-8").to_string()
}

struct BootFixture {
    base: PathBuf,
    layout: BootLayout,
}

impl BootFixture {
    fn new() -> Self {
        let base = scratch_dir();
        let layout = BootLayout::new(&base);
        fs::create_dir_all(layout.entries_dir()).expect("must create entries dir");
        fs::create_dir_all(base.join("EFI").join("Arch")).expect("must create EFI dir");
        Self { base, layout }
    }

    fn payload(&self, name: &str, contents: &str) -> String {
        let path = self.base.join("EFI").join("Arch").join(name);
        fs::write(&path, contents).expect("must write payload");
        path_string(&path)
    }

    fn arch_entry(&self, efi: &str) -> Entry {
        Entry::new(self.layout.entry_path("arch.conf"), "/")
            .with_values(Field::Title, ["Arch Linux"])
            .with_values(Field::SortKey, ["linux"])
            .with_values(Field::Version, ["linux5.19"])
            .with_values(Field::Efi, [efi])
    }
}

impl Drop for BootFixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.base);
    }
}

#[test]
fn parse_descriptor_handles_comments_whitespace_and_repeats() {
    let cases: [(&str, Vec<(Field, Vec<&str>)>); 7] = [
        ("", vec![]),
        ("title", vec![]),
        ("title Arch Linux", vec![(Field::Title, vec!["Arch Linux"])]),
        ("options root=/dev/sda2 rw", vec![(Field::Options, vec!["root=/dev/sda2 rw"])]),
        ("title a\n#version 5", vec![(Field::Title, vec!["a"])]),
        ("title a\n  # version 5", vec![(Field::Title, vec!["a"])]),
        (
            "initrd intel-ucode.img\ninitrd\tamd-ucode.img\n sort-key    arch\nunknown x",
            vec![
                (Field::Initrd, vec!["intel-ucode.img", "amd-ucode.img"]),
                (Field::SortKey, vec!["arch"]),
            ],
        ),
    ];

    for (raw, expected) in cases {
        let entry = parse_descriptor("/efi/loader/entries/arch.conf", "/efi", raw);
        let mut wanted = Entry::new("/efi/loader/entries/arch.conf", "/efi");
        for (field, values) in expected {
            wanted = wanted.with_values(field, values);
        }
        assert_eq!(entry, wanted, "parsing {raw:?}");
    }
}

#[test]
fn render_descriptor_uses_table_order_and_disk_keys() {
    let entry = Entry::new("/efi/loader/entries/arch.conf", "/efi")
        .with_values(Field::Initrd, ["intel-ucode.img", "amd-ucode.img"])
        .with_values(Field::Linux, ["/vmlinuz-linux"])
        .with_values(Field::SortKey, ["linux"])
        .with_values(Field::Title, ["Arch Linux"])
        .with_values(Field::MachineId, ["abc"]);

    assert_eq!(
        render_descriptor(&entry),
        "title\tArch Linux\nmachine-id\tabc\nsort-key\tlinux\nlinux\t/vmlinuz-linux\ninitrd\tintel-ucode.img\ninitrd\tamd-ucode.img\n"
    );
    assert_eq!(render_descriptor(&Entry::default()), "");
}

#[test]
fn field_table_maps_both_spellings() {
    assert_eq!(Field::from_key("sort-key"), Some(Field::SortKey));
    assert_eq!(Field::from_key("sort_key"), Some(Field::SortKey));
    assert_eq!(Field::from_key("devicetree-overlay"), Some(Field::DevicetreeOverlay));
    assert_eq!(Field::from_key("showTitle"), None);
    assert_eq!(Field::PAYLOAD.map(Field::is_payload), [true; 3]);
    assert_eq!(Field::Title.comparison(), Comparison::Ignored);
    assert_eq!(Field::Options.comparison(), Comparison::Literal);
}

#[test]
fn lifeboats_are_recognised_by_file_name_only() {
    let live = Entry::new("/efi/loader/entries/arch.conf", "/efi");
    let lifeboat = Entry::new("/efi/loader/entries/lifeboat_12345_arch.conf", "/efi");
    let lookalike = Entry::new("/efi/lifeboat_12345_dir/arch.conf", "/efi");

    assert!(!live.is_lifeboat());
    assert_eq!(lifeboat.timestamp(), Some(12345));
    assert!(lifeboat.is_lifeboat());
    assert!(!lookalike.is_lifeboat());
}

#[test]
fn newest_first_breaks_timestamp_ties_by_path() {
    let mut lifeboats = vec![
        Entry::new("/efi/loader/entries/lifeboat_100_arch.conf", "/efi"),
        Entry::new("/efi/loader/entries/lifeboat_300_arch.conf", "/efi"),
        Entry::new("/efi/loader/entries/lifeboat_200_arch.conf", "/efi"),
        Entry::new("/efi/loader/entries/lifeboat_200_zen.conf", "/efi"),
    ];
    lifeboats.sort_by(newest_first);

    let names = lifeboats.iter().map(Entry::basename).collect::<Vec<_>>();
    assert_eq!(
        names,
        [
            "lifeboat_300_arch.conf",
            "lifeboat_200_zen.conf",
            "lifeboat_200_arch.conf",
            "lifeboat_100_arch.conf"
        ]
    );
}

#[test]
fn equivalence_ignores_title_and_version_and_is_symmetric() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let copy = fixture.payload("lifeboat_12345_linux.efi", "my cool efi");
    let different = fixture.payload("different.efi", "other efi");
    let mut context = RootContext::new();

    let live = fixture.arch_entry(&efi);
    let retitled = live
        .clone()
        .with_values(Field::Title, ["Something else"])
        .with_values(Field::Version, ["-linux5.19-12345"])
        .with_values(Field::Efi, [copy.as_str()]);
    let changed_payload = live.clone().with_values(Field::Efi, [different.as_str()]);
    let changed_options = live.clone().with_values(Field::Options, ["quiet"]);

    for (other, expected) in [
        (&retitled, true),
        (&changed_payload, false),
        (&changed_options, false),
    ] {
        let forward = equivalent(&mut context, &live, other).expect("no root switch needed");
        let backward = equivalent(&mut context, other, &live).expect("no root switch needed");
        assert_eq!(forward, expected);
        assert_eq!(forward, backward);
    }
}

#[test]
fn equivalence_compares_payload_sets_not_order() {
    let fixture = BootFixture::new();
    let intel = fixture.payload("intel-ucode.img", "intel");
    let amd = fixture.payload("amd-ucode.img", "amd");
    let mut context = RootContext::new();

    let left = fixture.arch_entry(&intel).with_values(Field::Initrd, [&intel, &amd]);
    let right = left.clone().with_values(Field::Initrd, [&amd, &intel]);

    assert!(equivalent(&mut context, &left, &right).expect("no root switch needed"));
}

#[test]
fn equivalence_fails_closed_on_missing_payload() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let missing = path_string(&fixture.base.join("EFI").join("Arch").join("gone.efi"));
    let mut context = RootContext::new();

    let live = fixture.arch_entry(&efi);
    let broken = live.clone().with_values(Field::Efi, [missing.as_str()]);
    let both_broken = broken.clone();

    assert!(!equivalent(&mut context, &live, &broken).expect("digest errors are not returned"));
    assert!(!equivalent(&mut context, &broken, &live).expect("digest errors are not returned"));
    assert!(!equivalent(&mut context, &broken, &both_broken).expect("digest errors are not returned"));
}

#[test]
fn create_lifeboat_copies_payloads_and_writes_descriptor() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let live = fixture.arch_entry(&efi);
    let mut context = RootContext::new();

    let lifeboat = create_lifeboat(&mut context, &FileOps::default(), &live, 12345)
        .expect("lifeboat creation must succeed");

    let expected_efi = path_string(&fixture.base.join("EFI/Arch/lifeboat_12345_linux.efi"));
    assert_eq!(lifeboat.path, fixture.layout.entry_path("lifeboat_12345_arch.conf"));
    assert_eq!(lifeboat.efi, vec![expected_efi.clone()]);
    assert_eq!(
        lifeboat.title,
        vec![format!("Arch Linux @{}", pretty_date(12345))]
    );
    assert_eq!(lifeboat.version, vec!["-linux5.19-12345".to_string()]);
    assert_eq!(lifeboat.sort_key, live.sort_key);
    assert!(!lifeboat.autosave);
    assert_eq!(context.depth(), 0);

    assert_eq!(fs::read_to_string(&expected_efi).expect("must read copy"), "my cool efi");
    let on_disk = read_descriptor(&lifeboat.path, Path::new("/")).expect("must read lifeboat");
    assert_eq!(on_disk, lifeboat);
    assert!(equivalent(&mut context, &live, &on_disk).expect("no root switch needed"));
    assert_eq!(
        compare_versions(&on_disk.version[0], &live.version[0]),
        std::cmp::Ordering::Less
    );
}

#[test]
fn create_lifeboat_titles_untitled_entries_by_file_name() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let live = fixture.arch_entry(&efi).with_values(Field::Title, Vec::<String>::new());
    let mut context = RootContext::new();

    let lifeboat = create_lifeboat(&mut context, &FileOps::default(), &live, 7)
        .expect("lifeboat creation must succeed");

    assert_eq!(lifeboat.title, vec![format!("arch.conf @{}", pretty_date(7))]);
}

#[test]
fn create_lifeboat_rolls_back_when_descriptor_exists() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let live = fixture
        .arch_entry(&efi)
        .with_values(Field::Initrd, [fixture.payload("initrd.img", "initrd")]);
    let taken = fixture.layout.entry_path("lifeboat_12345_arch.conf");
    fs::write(&taken, "title\tsomeone else\n").expect("must write colliding descriptor");
    let mut context = RootContext::new();

    let err = create_lifeboat(&mut context, &FileOps::default(), &live, 12345)
        .expect_err("collision must fail");

    assert!(is_lifeboat_error(&err));
    assert!(!is_configuration_error(&err));
    assert!(!fixture.base.join("EFI/Arch/lifeboat_12345_linux.efi").exists());
    assert!(!fixture.base.join("EFI/Arch/lifeboat_12345_initrd.img").exists());
    assert_eq!(
        fs::read_to_string(&taken).expect("colliding descriptor must survive"),
        "title\tsomeone else\n"
    );
}

#[test]
fn create_lifeboat_rolls_back_earlier_copies_when_a_payload_is_missing() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let missing = path_string(&fixture.base.join("EFI/Arch/missing.img"));
    let live = fixture
        .arch_entry(&efi)
        .with_values(Field::Linux, [efi.as_str()])
        .with_values(Field::Initrd, [missing.as_str()]);
    let mut context = RootContext::new();

    create_lifeboat(&mut context, &FileOps::default(), &live, 9)
        .expect_err("missing payload must fail");

    assert!(!fixture.base.join("EFI/Arch/lifeboat_9_linux.efi").exists());
    assert!(!fixture.layout.entry_path("lifeboat_9_arch.conf").exists());
}

#[test]
fn unified_image_lifeboat_gets_its_own_descriptor() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool uki");
    let mut live = Entry::new(&efi, "/")
        .with_values(Field::Title, ["Arch Linux"])
        .with_values(Field::Linux, [efi.as_str()])
        .with_values(Field::Version, ["linux5.19"]);
    live.kind = EntryKind::UnifiedImage;
    let mut context = RootContext::new();

    let lifeboat = create_lifeboat(&mut context, &FileOps::new(true), &live, 12345)
        .expect("dry-run lifeboat creation must succeed");

    assert_eq!(lifeboat.kind, EntryKind::Descriptor);
    assert_eq!(lifeboat.path, PathBuf::from("/loader/entries/lifeboat_12345_linux.conf"));
    assert_eq!(
        lifeboat.linux,
        vec![path_string(&fixture.base.join("EFI/lifeboat/lifeboat_12345_linux.efi"))]
    );
    assert!(!fixture.base.join("EFI/lifeboat").exists());
    assert!(save_entry(&mut context, &FileOps::default(), &live).is_err());
}

#[test]
fn dry_run_creation_touches_nothing() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("linux.efi", "my cool efi");
    let live = fixture.arch_entry(&efi);
    let mut context = RootContext::new();

    let lifeboat = create_lifeboat(&mut context, &FileOps::new(true), &live, 12345)
        .expect("dry run must succeed");

    assert!(!lifeboat.path.exists());
    assert!(!fixture.base.join("EFI/Arch/lifeboat_12345_linux.efi").exists());
}

#[test]
fn remove_entry_deletes_payloads_then_descriptor() {
    let fixture = BootFixture::new();
    let efi = fixture.payload("lifeboat_1_linux.efi", "old");
    let lifeboat = fixture.arch_entry(&efi);
    let lifeboat = Entry {
        path: fixture.layout.entry_path("lifeboat_1_arch.conf"),
        ..lifeboat
    };
    fs::write(&lifeboat.path, render_descriptor(&lifeboat)).expect("must write descriptor");
    let mut context = RootContext::new();

    remove_entry(&mut context, &FileOps::default(), &lifeboat).expect("removal must succeed");

    assert!(!Path::new(&efi).exists());
    assert!(!lifeboat.path.exists());
    remove_entry(&mut context, &FileOps::default(), &lifeboat)
        .expect("removing twice only logs");
}

#[test]
fn save_entry_overwrites_only_autosaved_entries() {
    let fixture = BootFixture::new();
    let path = fixture.layout.entry_path("arch.conf");
    fs::write(&path, "title\tArch Linux\n").expect("must write descriptor");
    let mut context = RootContext::new();
    let mut entry = parse_descriptor(&path, "/", "title Arch Linux")
        .with_values(Field::SortKey, ["linux"]);

    assert!(save_entry(&mut context, &FileOps::default(), &entry).is_err());
    entry.autosave = true;
    save_entry(&mut context, &FileOps::default(), &entry).expect("autosave must overwrite");

    assert_eq!(
        fs::read_to_string(&path).expect("must read"),
        "title\tArch Linux\nsort-key\tlinux\n"
    );
}

#[test]
fn entries_dir_source_reads_descriptors_and_loader_default() {
    let fixture = BootFixture::new();
    fs::write(fixture.layout.entry_path("arch.conf"), "title Arch\nefi /EFI/Arch/linux.efi\n")
        .expect("must write arch");
    fs::write(
        fixture.layout.entry_path("lifeboat_5_arch.conf"),
        "title Arch @then\nefi /EFI/Arch/lifeboat_5_linux.efi\n",
    )
    .expect("must write lifeboat");
    fs::write(fixture.layout.entries_dir().join("notes.txt"), "ignored").expect("must write notes");
    fs::write(fixture.layout.loader_conf_path(), "timeout 3\ndefault arch\n").expect("must write loader.conf");
    let source = EntriesDirSource::new(&fixture.base);
    let mut context = RootContext::new();

    let entries = source.entries(&mut context).expect("must list entries");
    let names = entries.iter().map(Entry::basename).collect::<Vec<_>>();
    assert_eq!(names, ["arch.conf", "lifeboat_5_arch.conf"]);
    assert!(entries.iter().all(|entry| entry.root == fixture.base));
    assert!(entries[0].is_default);
    assert!(!entries[1].is_default);
    assert_eq!(entries[0].efi, vec!["/EFI/Arch/linux.efi".to_string()]);

    fs::write(fixture.layout.loader_conf_path(), "default arch.conf\n").expect("must write loader.conf");
    assert_eq!(
        source.default_entry_path(&mut context).expect("default must resolve"),
        fixture.layout.entry_path("arch.conf")
    );
}

#[test]
fn entries_dir_source_without_matching_default_is_a_configuration_error() {
    let fixture = BootFixture::new();
    fs::write(fixture.layout.entry_path("arch.conf"), "title Arch\n").expect("must write arch");
    let source = EntriesDirSource::new(&fixture.base);
    let mut context = RootContext::new();

    let err = source.default_entry_path(&mut context).expect_err("no loader.conf");
    assert!(is_configuration_error(&err));

    fs::write(fixture.layout.loader_conf_path(), "default notarch\n").expect("must write loader.conf");
    let err = source.default_entry_path(&mut context).expect_err("unmatched default");
    assert!(is_configuration_error(&err));
    assert!(err.to_string().contains("could not determine the default entry"));
}
