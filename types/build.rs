fn main() {
    println!("cargo:rerun-if-changed=proto/rank.proto");
    tonic_prost_build::configure()
        .compile_protos(&["proto/rank.proto"], &["proto/"])
        .expect("Failed to compile proto/rank.proto");
}
