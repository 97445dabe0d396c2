mod common;

use common::{
    encrypt_package, encrypted_pdf, is_zip, plain_docx, plain_pdf, small_docx, PASSWORD,
};
use mass_decrypt::{run, BatchOptions, DocumentClasses, NoProgress, PasswordList, RunTally};

#[test]
fn mixed_folder_is_tallied_per_outcome() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let plain = plain_docx();

    std::fs::write(root.join("a.docx"), encrypt_package(&plain, PASSWORD)).expect("write a");
    std::fs::write(root.join("b.docx"), encrypt_package(&plain, "other")).expect("write b");
    std::fs::write(root.join("c.xlsx"), &plain).expect("write c");
    std::fs::write(root.join("d.pdf"), b"not a pdf").expect("write d");
    std::fs::write(root.join("e.txt"), b"ignored").expect("write e");

    let options = BatchOptions {
        root: root.to_path_buf(),
        recursive: false,
        classes: DocumentClasses::ALL,
        integrity_check: false,
    };
    let passwords: PasswordList = ["other", PASSWORD].into_iter().collect();
    let tally = run(&options, &passwords, &mut NoProgress).expect("run");

    assert_eq!(
        tally,
        RunTally {
            decrypted: 2,
            unencrypted: 1,
            errors: 1,
        }
    );
    assert!(is_zip(&std::fs::read(root.join("a.docx")).expect("read a")));
    assert!(is_zip(&std::fs::read(root.join("b.docx")).expect("read b")));
    assert_eq!(std::fs::read(root.join("d.pdf")).expect("read d"), b"not a pdf");
}

#[test]
fn only_selected_classes_are_touched() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let encrypted_docx = encrypt_package(&plain_docx(), PASSWORD);
    std::fs::write(root.join("letter.docx"), &encrypted_docx).expect("write docx");
    std::fs::write(root.join("scan.pdf"), encrypted_pdf(PASSWORD, "owner")).expect("write pdf");

    let options = BatchOptions {
        root: root.to_path_buf(),
        recursive: false,
        classes: DocumentClasses {
            office: false,
            pdf: true,
        },
        integrity_check: true,
    };
    let tally = run(&options, &PasswordList::single(PASSWORD), &mut NoProgress).expect("run");

    assert_eq!(
        tally,
        RunTally {
            decrypted: 1,
            unencrypted: 0,
            errors: 0,
        }
    );
    assert_eq!(
        std::fs::read(root.join("letter.docx")).expect("read docx"),
        encrypted_docx
    );
}

#[test]
fn recursion_reaches_nested_folders_only_when_asked() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    std::fs::create_dir_all(root.join("2023/q4")).expect("mkdir");
    std::fs::write(root.join("top.pdf"), plain_pdf()).expect("write top");
    std::fs::write(root.join("2023/q4/deep.pdf"), encrypted_pdf(PASSWORD, "owner"))
        .expect("write deep");

    let mut options = BatchOptions {
        root: root.to_path_buf(),
        recursive: false,
        classes: DocumentClasses::ALL,
        integrity_check: false,
    };
    let passwords = PasswordList::single(PASSWORD);

    let shallow = run(&options, &passwords, &mut NoProgress).expect("shallow run");
    assert_eq!(shallow.total(), 1);
    assert_eq!(shallow.unencrypted, 1);

    options.recursive = true;
    let deep = run(&options, &passwords, &mut NoProgress).expect("deep run");
    assert_eq!(
        deep,
        RunTally {
            decrypted: 1,
            unencrypted: 1,
            errors: 0,
        }
    );
}

#[test]
fn undecodable_package_does_not_stop_the_batch() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let small = encrypt_package(&small_docx(), PASSWORD);
    std::fs::write(root.join("a-small.docx"), &small).expect("write small");
    std::fs::write(root.join("b-plain.docx"), plain_docx()).expect("write plain");

    let options = BatchOptions {
        root: root.to_path_buf(),
        recursive: false,
        classes: DocumentClasses::ALL,
        integrity_check: false,
    };
    let tally = run(&options, &PasswordList::single("wrong"), &mut NoProgress).expect("run");

    assert_eq!(
        tally,
        RunTally {
            decrypted: 0,
            unencrypted: 1,
            errors: 1,
        }
    );
    assert_eq!(std::fs::read(root.join("a-small.docx")).expect("read small"), small);
}
