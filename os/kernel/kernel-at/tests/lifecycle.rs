use kernel_at::{AddressTranslation, Config, DebugFs, InitError};
use kernel_rmap::fake::{FakeHost, FakeHostBuilder};
use std::cell::RefCell;

/// Records every call and fails creation on request.
#[derive(Default)]
struct RecordingFs {
    calls: RefCell<Vec<String>>,
    fail_dir: bool,
    fail_file: bool,
}

impl DebugFs for &RecordingFs {
    type Dentry = String;

    fn create_dir(&self, name: &str) -> Option<String> {
        self.calls.borrow_mut().push(format!("mkdir {name}"));
        (!self.fail_dir).then(|| name.to_owned())
    }

    fn create_file(&self, name: &str, mode: u16, parent: &String) -> Option<String> {
        self.calls
            .borrow_mut()
            .push(format!("create {parent}/{name} {mode:o}"));
        (!self.fail_file).then(|| format!("{parent}/{name}"))
    }

    fn remove_recursive(&self, dentry: String) {
        self.calls.borrow_mut().push(format!("rm -r {dentry}"));
    }
}

fn host() -> FakeHost {
    FakeHostBuilder::default().build()
}

#[test]
fn init_publishes_and_drop_removes() {
    let host = host();
    let fs = RecordingFs::default();

    let module = AddressTranslation::init(&host, &fs, Config::default()).unwrap();
    assert_eq!(module.file(), "at/at");
    assert_eq!(*fs.calls.borrow(), ["mkdir at", "create at/at 644"]);

    module.endpoint().open().unwrap();
    module.endpoint().write(b"1000").unwrap();
    module.endpoint().release().unwrap();
    drop(module);

    assert_eq!(
        *fs.calls.borrow(),
        ["mkdir at", "create at/at 644", "rm -r at"]
    );
}

#[test]
fn directory_failure_aborts_init() {
    let host = host();
    let fs = RecordingFs {
        fail_dir: true,
        ..RecordingFs::default()
    };

    let err = AddressTranslation::init(&host, &fs, Config::default()).err();
    assert_eq!(err, Some(InitError::CreateDir));
    assert_eq!(*fs.calls.borrow(), ["mkdir at"]);
}

#[test]
fn file_failure_removes_the_directory() {
    let host = host();
    let fs = RecordingFs {
        fail_file: true,
        ..RecordingFs::default()
    };

    let err = AddressTranslation::init(&host, &fs, Config::default()).err();
    assert_eq!(err, Some(InitError::CreateFile));
    assert_eq!(
        *fs.calls.borrow(),
        ["mkdir at", "create at/at 644", "rm -r at"]
    );
}

#[test]
fn configured_names_and_mode_are_used() {
    let host = host();
    let fs = RecordingFs::default();
    let config = Config {
        dir_name: "translate",
        file_name: "query",
        file_mode: 0o600,
        ..Config::default()
    };

    let module = AddressTranslation::init(&host, &fs, config).unwrap();
    assert_eq!(module.endpoint().config().file_mode, 0o600);
    drop(module);
    assert_eq!(
        *fs.calls.borrow(),
        ["mkdir translate", "create translate/query 600", "rm -r translate"]
    );
}
