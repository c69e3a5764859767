fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to the vendored protoc when none is installed
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
        std::env::set_var("PROTOC", protoc);
    }

    println!("cargo:rerun-if-changed=proto/jobdock.proto");
    tonic_build::compile_protos("proto/jobdock.proto")?;
    Ok(())
}
