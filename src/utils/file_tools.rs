//! 文件工具模块
//!
//! 提供滚动文件 Sink 使用的文件操作工具函数：目录创建、权限检查、
//! 打开追加文件和安全删除。

use crate::error::{Result, StrataLogError};
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// 文件工具结构体
///
/// 提供各种文件操作的静态方法
pub struct FileTools;

impl FileTools {
    /// 确保目录存在，如果不存在则创建
    pub fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Ok(());
        }

        if !path.exists() {
            fs::create_dir_all(path)?
        } else if !path.is_dir() {
            return Err(StrataLogError::IoError {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("路径存在但不是目录: {}", path.display()),
                ),
            });
        }

        Ok(())
    }

    /// 以追加模式打开文件，必要时创建文件及父目录
    pub fn open_file_append<P: AsRef<Path>>(file_path: P) -> Result<File> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            Self::ensure_directory_exists(parent)?;
        }

        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?)
    }

    /// 获取文件大小（字节），文件不存在时返回 `None`
    pub fn file_size<P: AsRef<Path>>(file_path: P) -> Option<u64> {
        fs::metadata(file_path).ok().map(|m| m.len())
    }

    /// 检查文件是否可写
    ///
    /// 文件不存在时检查（将被创建的）父目录是否可写。
    pub fn is_file_writable<P: AsRef<Path>>(file_path: P) -> bool {
        let file_path = file_path.as_ref();

        if !file_path.exists() {
            return match file_path.parent() {
                Some(parent) if parent.as_os_str().is_empty() => Self::is_directory_writable("."),
                Some(parent) => {
                    Self::ensure_directory_exists(parent).is_ok()
                        && Self::is_directory_writable(parent)
                }
                None => false,
            };
        }

        OpenOptions::new().append(true).open(file_path).is_ok()
    }

    /// 检查目录是否可写
    pub fn is_directory_writable<P: AsRef<Path>>(dir_path: P) -> bool {
        let dir_path = dir_path.as_ref();

        if !dir_path.is_dir() {
            return false;
        }

        // 尝试在目录中创建临时文件
        let temp_file = dir_path.join(format!(".strata_log_write_test_{}", std::process::id()));
        let result = File::create(&temp_file).is_ok();

        if temp_file.exists() {
            let _ = fs::remove_file(&temp_file);
        }

        result
    }

    /// 安全地删除文件，文件不存在时视为成功
    pub fn remove_file_safe<P: AsRef<Path>>(file_path: P) -> Result<()> {
        match fs::remove_file(file_path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
