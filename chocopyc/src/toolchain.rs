use std::{
    io::Write,
    path::Path,
    process::{Command, Output},
};

use anyhow::{bail, Context, Result};
use log::debug;

/// External tools turning IR text into an executable. The IR relies on opaque
/// pointers, which `llc` defaults to from LLVM 15 on.
pub struct Toolchain<'a> {
    pub llc: &'a Path,
    /// Passed to `llc` before the input file.
    pub llc_args: &'a [String],
    pub cc: &'a Path,
    pub opt_level: u8,
}

impl Toolchain<'_> {
    /// Assembles `ir` into an object and links it into `output`. The scratch
    /// files are removed on every path out of this function.
    pub fn build_executable(&self, ir: &str, output: &Path) -> Result<()> {
        let mut ir_file = tempfile::Builder::new()
            .prefix("chocopy")
            .suffix(".ll")
            .tempfile()
            .context("failed to create the IR scratch file")?;
        ir_file.write_all(ir.as_bytes())?;
        ir_file.flush()?;

        let object = tempfile::Builder::new()
            .prefix("chocopy")
            .suffix(".o")
            .tempfile()
            .context("failed to create the object scratch file")?;

        let mut llc = Command::new(self.llc);
        llc.arg(format!("-O{}", self.opt_level))
            .arg("-filetype=obj")
            .arg("-relocation-model=pic")
            .args(self.llc_args)
            .arg("-o")
            .arg(object.path())
            .arg(ir_file.path());
        run(&mut llc)?;

        let mut cc = Command::new(self.cc);
        cc.args(["-Wall", "-Wextra", "-Wwrite-strings", "-g3"])
            .arg("-o")
            .arg(output)
            .arg(object.path());
        run(&mut cc)?;
        Ok(())
    }
}

fn run(command: &mut Command) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!("running {command:?}");
    let output = command
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} failed ({}):\n{}", output.status, stderr.trim_end());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tools = Toolchain {
            llc: Path::new("chocopyc-no-such-llc"),
            llc_args: &[],
            cc: Path::new("gcc"),
            opt_level: 0,
        };
        let error = tools
            .build_executable("", &dir.path().join("out"))
            .unwrap_err();
        assert_eq!(error.to_string(), "failed to run chocopyc-no-such-llc");
    }
}
