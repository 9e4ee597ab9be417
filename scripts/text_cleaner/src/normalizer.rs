//! 单元格文本的规范化。

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::lexicon::{Lemmatize, Stopwords};

lazy_static! {
    /// 小写 ASCII 字母和空白之外的所有字符。空白包含 U+001C 到 U+001F 这四个信息分隔符。
    static ref NON_ALPHA_RE: Regex = Regex::new(r"[^a-z\s\x1C-\x1F]").unwrap();
}

/// Unicode 空白，外加被当作空白的信息分隔符 U+001C 到 U+001F。
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// 将任意文本规范化为由空格分隔的小写词元。
///
/// 处理顺序固定：
/// 1. 转为小写；
/// 2. 删除所有非 `a-z` 且非空白的字符（数字、标点和非 ASCII 字符直接丢弃，不做转写）；
/// 3. 按空白（含 U+001C 到 U+001F）切分，连续的空白不会产生空词元；
/// 4. 去除停用词；
/// 5. 对剩余词元做词形还原；
/// 6. 以单个空格重新拼接。
///
/// 停用词表与词形还原器以只读引用注入，同一个实例可以在多个线程间共享。
#[derive(Clone, Copy)]
pub struct TextNormalizer<'a> {
    stopwords: &'a Stopwords,
    lemmatizer: &'a dyn Lemmatize,
}

impl<'a> TextNormalizer<'a> {
    pub fn new(stopwords: &'a Stopwords, lemmatizer: &'a dyn Lemmatize) -> Self {
        Self {
            stopwords,
            lemmatizer,
        }
    }

    /// 清洗一个单元格。非字符串的值（数字、布尔、空值等）没有可清洗的内容，返回空字符串。
    pub fn clean_value(&self, value: &Value) -> String {
        match value {
            Value::String(text) => self.clean_text(text),
            _ => String::new(),
        }
    }

    pub fn clean_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let letters_only = NON_ALPHA_RE.replace_all(&lowered, "");

        letters_only
            .split(is_separator)
            .filter(|token| !token.is_empty() && !self.stopwords.contains(token))
            .map(|token| self.lemmatizer.lemmatize(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Debug for TextNormalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextNormalizer")
            .field("stopwords", &self.stopwords.len())
            .finish_non_exhaustive()
    }
}
