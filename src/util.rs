use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use crate::CommonResult;

pub fn get_file(file_path: &Path) -> CommonResult<File> {
    let f = OpenOptions::new().read(true).open(file_path)?;

    Ok(f)
}

// 标签统一显示成 "GGGG,EEEE"，字典里的键也是这个格式
pub fn format_tag(group: u16, element: u16) -> String {
    format!("{:04X},{:04X}", group, element)
}

// 下面这些读取函数都假定调用方已经检查过长度
pub fn read_u16(bytes: &[u8], little_endian: bool) -> u16 {
    let raw = [bytes[0], bytes[1]];
    if little_endian {
        u16::from_le_bytes(raw)
    } else {
        u16::from_be_bytes(raw)
    }
}

pub fn read_i16(bytes: &[u8], little_endian: bool) -> i16 {
    read_u16(bytes, little_endian) as i16
}

pub fn read_u32(bytes: &[u8], little_endian: bool) -> u32 {
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if little_endian {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    }
}

pub fn read_i32(bytes: &[u8], little_endian: bool) -> i32 {
    read_u32(bytes, little_endian) as i32
}

pub fn read_f32(bytes: &[u8], little_endian: bool) -> f32 {
    f32::from_bits(read_u32(bytes, little_endian))
}

pub fn read_f64(bytes: &[u8], little_endian: bool) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    if little_endian {
        f64::from_le_bytes(raw)
    } else {
        f64::from_be_bytes(raw)
    }
}

/// Hex rendering of at most `limit` bytes, for log lines.
pub fn hex_preview(bytes: &[u8], limit: usize) -> String {
    let mut result = bytes
        .iter()
        .take(limit)
        .map(|v| format!("{:02X}", v))
        .collect::<Vec<String>>()
        .join(" ");

    if bytes.len() > limit {
        result.push_str(" ..");
    }

    result
}
