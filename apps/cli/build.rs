//! hb-cli 用ビルドスクリプト。
//!
//! macOS では resources/Info.plist を __TEXT,__info_plist に埋め込む
//! （SMJobBless は呼び出し元の SMPrivilegedExecutables を参照する）。

fn main() {
    let plist = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/Info.plist");
    println!("cargo:rerun-if-changed={plist}");
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-arg-bins=-Wl,-sectcreate,__TEXT,__info_plist,{plist}");
    }
}
