use std::{env, path::PathBuf, process::Command};

fn main() {
    println!("cargo::rustc-check-cfg=cfg(jetson_cuda)");
    println!("cargo:rerun-if-changed=src/cuda");

    let target = env::var("TARGET").expect("TARGET is set by cargo");

    if !target.contains("aarch64-unknown-linux") {
        println!("cargo:warning=Building without CUDA (not on Jetson), GPU strategies use the emulated device");
        return;
    }

    println!("cargo:rustc-cfg=jetson_cuda");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    //
    // ---- Jetson Orin Nano architecture ----
    //
    let arch = "compute_87";
    let code = "sm_87";

    //
    // ---- Compile each .cu file into PTX ----
    //
    let kernels = ["src/cuda/kernels/demosaic.cu", "src/cuda/kernels/color.cu"];

    for kernel in kernels {
        let kpath = PathBuf::from(kernel);
        let name = kpath
            .file_stem()
            .and_then(|stem| stem.to_str())
            .expect("kernel paths have a UTF-8 file stem");
        let ptx_file = out_dir.join(format!("{name}.ptx"));

        println!("cargo:warning=Compiling {kernel} → {name}.ptx");

        let status = Command::new("nvcc")
            .arg("-ptx")
            .arg("-o")
            .arg(&ptx_file)
            .arg(&kpath)
            .arg(format!("-arch={}", arch))
            .arg(format!("-code={}", code))
            .status()
            .expect("Failed to run nvcc");

        assert!(status.success(), "Failed to compile {kernel} to PTX");
    }
}
