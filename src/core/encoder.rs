//! 编码配置
//!
//! 所有 sink 共享同一套固定键名，输出为两种形态之一：制表符分隔的控制台行，
//! 或单行 JSON 对象。

use crate::core::level::Rank;
use crate::core::record::LogRecord;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// 时间戳的日期和时间部分，后接七位小数秒
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// 以固定七位小数秒格式化时间戳
pub fn format_time(ts: DateTime<Utc>) -> String {
    // 闰秒的纳秒值（>= 1e9）截断，保持宽度不变
    let ticks = ts.timestamp_subsec_nanos().min(999_999_999) / 100;
    format!("{}.{:07}", ts.format(TIME_LAYOUT), ticks)
}

/// 记录编码后的形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderShape {
    /// 便于阅读的制表符分隔行
    Console,
    /// 每行一个 JSON 对象
    Json,
}

/// 内置字段的输出键名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderKeys {
    pub message: &'static str,
    pub level: &'static str,
    pub time: &'static str,
    pub name: &'static str,
    pub caller: &'static str,
    pub stacktrace: &'static str,
}

impl Default for EncoderKeys {
    fn default() -> Self {
        Self {
            message: "msg",
            level: "level",
            time: "time",
            name: "logger",
            caller: "caller",
            stacktrace: "stacktrace",
        }
    }
}

/// 所有 sink 共享的字段布局和序列化方式
///
/// 不含可变状态，通过 `Arc` 在线程间共享。
#[derive(Debug, Clone, Default)]
pub struct EncoderProfile {
    keys: EncoderKeys,
    color_levels: bool,
}

impl EncoderProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 控制台形态下为级别着色
    pub fn with_color_levels(mut self, enabled: bool) -> Self {
        self.color_levels = enabled;
        self
    }

    pub fn keys(&self) -> &EncoderKeys {
        &self.keys
    }

    /// 把记录编码为指定形态、以换行结尾的一行
    pub fn encode(&self, record: &LogRecord, shape: EncoderShape) -> Vec<u8> {
        match shape {
            EncoderShape::Console => self.encode_console(record).into_bytes(),
            EncoderShape::Json => self.encode_json(record),
        }
    }

    fn encode_console(&self, record: &LogRecord) -> String {
        let mut line = String::with_capacity(128 + record.message().len());
        line.push_str(&format_time(record.timestamp()));
        line.push('\t');
        line.push_str(&self.console_level(record.rank()));
        if let Some(name) = record.logger_name() {
            line.push('\t');
            line.push_str(name);
        }
        if let Some(caller) = record.caller() {
            line.push('\t');
            line.push_str(&caller.short());
        }
        line.push('\t');
        line.push_str(record.message());

        if !record.fields().is_empty() {
            line.push('\t');
            line.push_str(&Self::fields_object(record.fields()));
        }
        line.push('\n');

        if let Some(stacktrace) = record.stacktrace() {
            line.push_str(stacktrace.trim_end());
            line.push('\n');
        }
        line
    }

    fn console_level(&self, rank: Rank) -> String {
        let text = rank.as_capital_str();
        if !self.color_levels {
            return text.to_string();
        }
        match rank {
            Rank::Debug => text.magenta().to_string(),
            Rank::Info => text.blue().to_string(),
            Rank::Warn => text.yellow().to_string(),
            Rank::Error | Rank::DPanic | Rank::Panic | Rank::Fatal => text.red().to_string(),
        }
    }

    fn encode_json(&self, record: &LogRecord) -> Vec<u8> {
        let line = JsonLine {
            keys: &self.keys,
            record,
        };
        let mut out = Vec::with_capacity(160 + record.message().len());
        if let Err(e) = serde_json::to_writer(&mut out, &line) {
            out.clear();
            let mut fallback = serde_json::Map::new();
            fallback.insert(
                self.keys.message.to_string(),
                Value::from(format!("encode failed: {}", e)),
            );
            out.extend_from_slice(Value::Object(fallback).to_string().as_bytes());
        }
        out.push(b'\n');
        out
    }

    fn fields_object(fields: &[(String, Value)]) -> String {
        serde_json::to_string(&FieldsView(fields)).unwrap_or_else(|_| String::from("{}"))
    }
}

/// JSON 形态的一行：按固定键序写出内置字段，随后是附加字段
struct JsonLine<'a> {
    keys: &'a EncoderKeys,
    record: &'a LogRecord,
}

impl Serialize for JsonLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.record;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.keys.level, record.rank().as_capital_str())?;
        map.serialize_entry(self.keys.time, &format_time(record.timestamp()))?;
        if let Some(name) = record.logger_name() {
            map.serialize_entry(self.keys.name, name)?;
        }
        if let Some(caller) = record.caller() {
            map.serialize_entry(self.keys.caller, &caller.short())?;
        }
        map.serialize_entry(self.keys.message, record.message())?;
        for (key, value) in record.fields() {
            map.serialize_entry(key, value)?;
        }
        if let Some(stacktrace) = record.stacktrace() {
            map.serialize_entry(self.keys.stacktrace, stacktrace)?;
        }
        map.end()
    }
}

/// 按插入顺序序列化的字段列表
struct FieldsView<'a>(&'a [(String, Value)]);

impl Serialize for FieldsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
