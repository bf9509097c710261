//! 运行结果输出
//!
//! - 文本寄存器转储（`x{i} : {value}`，可附带期望值）
//! - 二进制寄存器转储（32 个小端字）
//! - 读取 `.res` 期望结果并逐个寄存器比较

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 寄存器数量
const NUM_REGS: usize = 32;
/// `.res` 文件的最小长度
const RES_LEN: usize = NUM_REGS * 4;

pub const DUMP_HEADER: &str = "Post-execution register content";
pub const EXPECTED_HEADER: &str = "Expected post-execution register content";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected-result file holds {len} bytes, need at least 128")]
    Truncated { len: usize },
}

impl ReportError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// 单个寄存器的不一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub reg: usize,
    pub actual: i32,
    pub expected: i32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x{} : got {} (0x{:08x}), expected {} (0x{:08x})",
            self.reg, self.actual, self.actual as u32, self.expected, self.expected as u32
        )
    }
}

/// 与镜像同名、后缀为 `_reg.txt` 的转储路径
pub fn default_dump_path(image: &Path) -> PathBuf {
    sibling_with_suffix(image, "_reg.txt")
}

/// 与镜像同名的 `.res` 期望结果路径
pub fn default_expected_path(image: &Path) -> PathBuf {
    sibling_with_suffix(image, ".res")
}

fn sibling_with_suffix(image: &Path, suffix: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image.with_file_name(format!("{stem}{suffix}"))
}

/// 写出文本转储
pub fn write_text_dump(
    out: &mut dyn Write,
    regs: &[i32; NUM_REGS],
    expected: Option<&[i32; NUM_REGS]>,
) -> io::Result<()> {
    out.write_all(render_text_dump(regs, expected).as_bytes())
}

fn reg_lines(regs: &[i32; NUM_REGS]) -> impl Iterator<Item = String> + '_ {
    regs.iter().enumerate().map(|(i, v)| format!("x{i} : {v}"))
}

/// 文本转储，每行以换行结尾
pub fn render_text_dump(regs: &[i32; NUM_REGS], expected: Option<&[i32; NUM_REGS]>) -> String {
    let mut lines = vec![DUMP_HEADER.to_string()];
    lines.extend(reg_lines(regs));

    if let Some(expected) = expected {
        lines.push(String::new());
        lines.push(EXPECTED_HEADER.to_string());
        lines.extend(reg_lines(expected));
    }

    lines.into_iter().map(|line| line + "\n").collect()
}

/// 二进制转储：32 个小端字
pub fn encode_binary(regs: &[i32; NUM_REGS]) -> Vec<u8> {
    regs.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// 解析期望结果：前 32 个小端字，多余字节忽略
pub fn parse_expected(bytes: &[u8]) -> Result<[i32; NUM_REGS], ReportError> {
    if bytes.len() < RES_LEN {
        return Err(ReportError::Truncated { len: bytes.len() });
    }

    let mut regs = [0i32; NUM_REGS];
    for (reg, chunk) in regs.iter_mut().zip(bytes.chunks_exact(4)) {
        *reg = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(regs)
}

pub fn read_expected(path: &Path) -> Result<[i32; NUM_REGS], ReportError> {
    let bytes = fs::read(path).map_err(ReportError::io(path))?;
    parse_expected(&bytes)
}

/// 逐个寄存器比较，返回所有不一致项
pub fn compare(actual: &[i32; NUM_REGS], expected: &[i32; NUM_REGS]) -> Vec<Mismatch> {
    actual
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (a, e))| a != e)
        .map(|(reg, (&actual, &expected))| Mismatch {
            reg,
            actual,
            expected,
        })
        .collect()
}

pub fn write_dump_file(
    path: &Path,
    regs: &[i32; NUM_REGS],
    expected: Option<&[i32; NUM_REGS]>,
) -> Result<(), ReportError> {
    let file = File::create(path).map_err(ReportError::io(path))?;
    let mut out = BufWriter::new(file);
    write_text_dump(&mut out, regs, expected)
        .and_then(|()| out.flush())
        .map_err(ReportError::io(path))
}

pub fn write_binary_file(path: &Path, regs: &[i32; NUM_REGS]) -> Result<(), ReportError> {
    fs::write(path, encode_binary(regs)).map_err(ReportError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_regs() -> [i32; NUM_REGS] {
        let mut regs = [0; NUM_REGS];
        regs[2] = 0x7FFF_FFFF;
        regs[5] = 5;
        regs[7] = -8;
        regs
    }

    #[test]
    fn test_text_dump_format() {
        let text = render_text_dump(&sample_regs(), None);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 33);
        assert_eq!(lines[0], "Post-execution register content");
        assert_eq!(lines[1], "x0 : 0");
        assert_eq!(lines[3], "x2 : 2147483647");
        assert_eq!(lines[8], "x7 : -8");
        assert_eq!(lines[32], "x31 : 0");
    }

    #[test]
    fn test_text_dump_with_expected() {
        let regs = sample_regs();
        let text = render_text_dump(&regs, Some(&regs));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 33 + 1 + 33);
        assert_eq!(lines[33], "");
        assert_eq!(lines[34], "Expected post-execution register content");
        assert_eq!(lines[35], "x0 : 0");
        assert_eq!(&lines[35..], &lines[1..33]);
    }

    #[test]
    fn test_write_text_dump_streams_same_text() {
        let regs = sample_regs();
        let mut out = Vec::new();
        write_text_dump(&mut out, &regs, Some(&regs)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), render_text_dump(&regs, Some(&regs)));

        let dir = tempfile::tempdir().unwrap();
        let missing_dir = dir.path().join("no_such_dir").join("prog_reg.txt");
        let err = write_dump_file(&missing_dir, &regs, None).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn test_binary_dump_is_little_endian() {
        let bytes = encode_binary(&sample_regs());
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[8..12], &[0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(&bytes[28..32], &[0xF8, 0xFF, 0xFF, 0xFF]);
        assert_eq!(parse_expected(&bytes).unwrap(), sample_regs());
    }

    #[test]
    fn test_parse_expected_rejects_short_file() {
        let err = parse_expected(&[0; 100]).unwrap_err();
        assert!(matches!(err, ReportError::Truncated { len: 100 }));
    }

    #[test]
    fn test_compare() {
        let actual = sample_regs();
        let mut expected = actual;
        assert!(compare(&actual, &expected).is_empty());

        expected[7] = 8;
        expected[31] = 1;
        let mismatches = compare(&actual, &expected);
        assert_eq!(
            mismatches,
            vec![
                Mismatch { reg: 7, actual: -8, expected: 8 },
                Mismatch { reg: 31, actual: 0, expected: 1 },
            ]
        );
        assert_eq!(
            mismatches[0].to_string(),
            "x7 : got -8 (0xfffffff8), expected 8 (0x00000008)"
        );
    }

    #[test]
    fn test_default_paths() {
        let image = Path::new("tests/task1/addlarge.bin");
        assert_eq!(default_dump_path(image), PathBuf::from("tests/task1/addlarge_reg.txt"));
        assert_eq!(default_expected_path(image), PathBuf::from("tests/task1/addlarge.res"));
    }

    #[test]
    fn test_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let regs = sample_regs();

        let res = dir.path().join("prog.res");
        write_binary_file(&res, &regs).unwrap();
        assert_eq!(read_expected(&res).unwrap(), regs);

        let dump = dir.path().join("prog_reg.txt");
        write_dump_file(&dump, &regs, Some(&regs)).unwrap();
        let text = fs::read_to_string(&dump).unwrap();
        assert!(text.starts_with("Post-execution register content\nx0 : 0\n"));

        let missing = dir.path().join("none.res");
        assert!(matches!(read_expected(&missing), Err(ReportError::Io { .. })));
    }
}
