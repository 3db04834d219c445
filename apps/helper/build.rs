//! hb-helper 用ビルドスクリプト。
//!
//! macOS では Info.plist と Launchd.plist を実行ファイルに埋め込む。
//! SMJobBless はこの2つのセクションを読んで登録する。

fn main() {
    let dir = env!("CARGO_MANIFEST_DIR");
    let info = format!("{dir}/resources/Info.plist");
    let launchd = format!("{dir}/resources/Launchd.plist");
    println!("cargo:rerun-if-changed={info}");
    println!("cargo:rerun-if-changed={launchd}");
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-arg-bins=-Wl,-sectcreate,__TEXT,__info_plist,{info}");
        println!("cargo:rustc-link-arg-bins=-Wl,-sectcreate,__TEXT,__launchd_plist,{launchd}");
    }
}
