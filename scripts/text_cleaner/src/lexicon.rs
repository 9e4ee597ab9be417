//! lexicon.rs
//!
//! 文本清洗所依赖的两类外部语言资源：
//! 1. 英文停用词表 `Stopwords`。
//! 2. 基于 WordNet morphy 规则的名词词形还原器 `WordNetLemmatizer`。
//!
//! 两者都在程序启动时加载一次，之后以只读引用的形式交给 `TextNormalizer`。
//! 资源内容与版本相关，因此默认使用随程序打包、版本固定的数据文件，
//! 也可以通过路径加载完整的外部词典。

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    env,
    ffi::OsString,
    fs,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use zip::ZipArchive;

use crate::types::CleanError;

/// 随程序打包的英文停用词表（NLTK 经典版本，179 个词）。
const BUNDLED_STOPWORDS: &str = include_str!("../resources/stopwords/english");
/// 随程序打包的精简名词词表，格式同 WordNet 的 `index.noun`。
const BUNDLED_NOUN_INDEX: &str = include_str!("../resources/lemma/index.noun");
/// 随程序打包的名词不规则变化表，格式同 WordNet 的 `noun.exc`。
const BUNDLED_NOUN_EXCEPTIONS: &str = include_str!("../resources/lemma/noun.exc");

/// 系统级的 NLTK 数据目录。
const NLTK_SYSTEM_DATA_DIRS: [&str; 4] = [
    "/usr/share/nltk_data",
    "/usr/local/share/nltk_data",
    "/usr/lib/nltk_data",
    "/usr/local/lib/nltk_data",
];
/// Debian/Ubuntu 的 `wordnet-base` 软件包安装词典的位置。
const SYSTEM_WORDNET_DIR: &str = "/usr/share/wordnet";

/// WordNet 名词的词尾替换规则，顺序与 morphy 一致。
const NOUN_SUBSTITUTIONS: [(&str, &str); 9] = [
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

//=============================================================================
// 停用词
//=============================================================================

/// 一组小写停用词。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// 从文本解析停用词表：每行一个词，忽略空行和以 `#` 开头的注释行。
    pub fn parse(content: &str) -> Self {
        let words = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    /// 使用随程序打包的英文停用词表。
    pub fn english() -> Self {
        Self::parse(BUNDLED_STOPWORDS)
    }

    pub fn from_file(path: &Path) -> Result<Self, CleanError> {
        let content = fs::read_to_string(path)?;
        let stopwords = Self::parse(&content);
        if stopwords.is_empty() {
            return Err(CleanError::InvalidLexicon(format!(
                "停用词文件 {path:?} 中没有任何词"
            )));
        }
        Ok(stopwords)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Stopwords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().map(|w| w.into().to_lowercase()).collect(),
        }
    }
}

//=============================================================================
// 词形还原
//=============================================================================

/// 将单词还原为词典中的基本形式。
///
/// 实现必须是纯函数，并且可以在多个线程之间共享。
pub trait Lemmatize: Send + Sync {
    fn lemmatize<'a>(&self, word: &'a str) -> Cow<'a, str>;
}

/// 不做任何处理的词形还原器。
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLemmatizer;

impl Lemmatize for IdentityLemmatizer {
    fn lemmatize<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(word)
    }
}

/// 按 WordNet morphy 规则还原名词的词形还原器。
///
/// 未指定词性时按名词处理，这也是常见 WordNet 词形还原器的默认行为。
/// 因此 "foxes" 会被还原为 "fox"，而 "running" 本身就是名词，保持不变。
#[derive(Debug, Clone, Default)]
pub struct WordNetLemmatizer {
    /// 词典中存在的名词基本形式。
    nouns: HashSet<String>,
    /// 不规则变化：屈折形式 -> 一个或多个基本形式。
    exceptions: HashMap<String, Vec<String>>,
}

impl WordNetLemmatizer {
    pub fn new(nouns: HashSet<String>, exceptions: HashMap<String, Vec<String>>) -> Self {
        Self { nouns, exceptions }
    }

    /// 从 `index.noun` 与 `noun.exc` 格式的文本构建。
    pub fn parse(index: &str, exceptions: &str) -> Result<Self, CleanError> {
        let nouns = parse_index(index);
        if nouns.is_empty() {
            return Err(CleanError::InvalidLexicon("名词词表为空".to_string()));
        }
        Ok(Self::new(nouns, parse_exceptions(exceptions)?))
    }

    /// 使用随程序打包的精简词表。
    ///
    /// # Errors
    ///
    /// 只有在打包的数据文件损坏时才会失败。
    pub fn bundled() -> Result<Self, CleanError> {
        Self::parse(BUNDLED_NOUN_INDEX, BUNDLED_NOUN_EXCEPTIONS)
    }

    /// 从 WordNet 词典加载。`path` 可以是包含 `index.noun` 与 `noun.exc` 的目录，
    /// 也可以是 NLTK 下载的 `wordnet.zip`。
    pub fn from_wordnet_path(path: &Path) -> Result<Self, CleanError> {
        if is_zip_file(path) {
            Self::from_wordnet_zip(path)
        } else {
            Self::from_wordnet_dir(path)
        }
    }

    /// 从 WordNet 词典目录（包含 `index.noun` 与 `noun.exc` 的 `dict` 目录）加载。
    pub fn from_wordnet_dir(dir: &Path) -> Result<Self, CleanError> {
        let index = fs::read_to_string(dir.join("index.noun"))?;
        let exceptions = fs::read_to_string(dir.join("noun.exc"))?;
        Self::parse(&index, &exceptions)
    }

    /// 从压缩包加载，`index.noun` 与 `noun.exc` 可以位于任意一级目录下（NLTK 为 `wordnet/`）。
    pub fn from_wordnet_zip(path: &Path) -> Result<Self, CleanError> {
        let mut archive = ZipArchive::new(fs::File::open(path)?)?;
        let index = read_zip_entry(&mut archive, "index.noun")?;
        let exceptions = read_zip_entry(&mut archive, "noun.exc")?;
        Self::parse(&index, &exceptions)
    }

    /// 在常见安装位置查找 WordNet 词典：`$WNSEARCHDIR`、`$NLTK_DATA`、
    /// `~/nltk_data` 与系统级 `nltk_data` 目录，最后是 `/usr/share/wordnet`。
    ///
    /// # 返回
    ///
    /// * `Ok(Some((lemmatizer, path)))` - 找到并成功加载的词典及其位置。
    /// * `Ok(None)` - 所有位置都不存在词典。
    /// * `Err(_)` - 找到了词典但加载失败。
    pub fn discover() -> Result<Option<(Self, PathBuf)>, CleanError> {
        let candidates = wordnet_candidates(
            env::var_os("WNSEARCHDIR"),
            env::var_os("NLTK_DATA"),
            env::var_os("HOME"),
        );
        Self::discover_in(&candidates)
    }

    /// 按顺序检查给定位置，加载第一个存在的词典。
    pub fn discover_in(candidates: &[PathBuf]) -> Result<Option<(Self, PathBuf)>, CleanError> {
        for candidate in candidates {
            if is_wordnet_location(candidate) {
                log::debug!("在 {candidate:?} 找到 WordNet 词典");
                let lemmatizer = Self::from_wordnet_path(candidate)?;
                return Ok(Some((lemmatizer, candidate.clone())));
            }
            log::trace!("{candidate:?} 处没有 WordNet 词典");
        }
        Ok(None)
    }

    pub fn noun_count(&self) -> usize {
        self.nouns.len()
    }

    /// morphy：列出所有存在于词典中的候选基本形式，保持候选顺序且不重复。
    fn morphy(&self, word: &str) -> Vec<String> {
        let candidates: Vec<String> = match self.exceptions.get(word) {
            Some(bases) => std::iter::once(word.to_string())
                .chain(bases.iter().cloned())
                .collect(),
            None => std::iter::once(word.to_string())
                .chain(
                    NOUN_SUBSTITUTIONS
                        .iter()
                        .filter_map(|&(old, new)| {
                            word.strip_suffix(old).map(|stem| format!("{stem}{new}"))
                        }),
                )
                .collect(),
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|form| self.nouns.contains(form) && seen.insert(form.clone()))
            .collect()
    }
}

impl Lemmatize for WordNetLemmatizer {
    /// 返回最短的候选形式；长度相同时取靠前的一个；没有候选时原样返回。
    fn lemmatize<'a>(&self, word: &'a str) -> Cow<'a, str> {
        let mut shortest: Option<String> = None;
        for form in self.morphy(word) {
            if shortest.as_ref().is_none_or(|s| form.len() < s.len()) {
                shortest = Some(form);
            }
        }
        match shortest {
            Some(lemma) if lemma != word => Cow::Owned(lemma),
            _ => Cow::Borrowed(word),
        }
    }
}

/// 列出可能存放 WordNet 词典的位置，按优先级排列。
fn wordnet_candidates(
    wnsearchdir: Option<OsString>,
    nltk_data: Option<OsString>,
    home: Option<OsString>,
) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = wnsearchdir.into_iter().map(PathBuf::from).collect();

    let mut data_roots: Vec<PathBuf> = nltk_data
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();
    if let Some(home) = home {
        data_roots.push(PathBuf::from(home).join("nltk_data"));
    }
    data_roots.extend(NLTK_SYSTEM_DATA_DIRS.iter().map(PathBuf::from));

    for root in data_roots {
        let corpora = root.join("corpora");
        candidates.push(corpora.join("wordnet"));
        candidates.push(corpora.join("wordnet.zip"));
    }
    candidates.push(PathBuf::from(SYSTEM_WORDNET_DIR));
    candidates
}

fn is_zip_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn is_wordnet_location(path: &Path) -> bool {
    is_zip_file(path) || path.join("index.noun").is_file()
}

/// 读取压缩包中名为 `file_name` 的文件，不区分其所在目录。
fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    file_name: &str,
) -> Result<String, CleanError> {
    let suffix = format!("/{file_name}");
    let entry_name = archive
        .file_names()
        .find(|name| *name == file_name || name.ends_with(&suffix))
        .map(ToString::to_string)
        .ok_or_else(|| CleanError::InvalidLexicon(format!("压缩包中缺少 {file_name}")))?;

    let mut content = String::new();
    archive.by_name(&entry_name)?.read_to_string(&mut content)?;
    Ok(content)
}

/// 解析 `index.noun`：每行第一个字段是词条，以空格开头的行是许可证头。
fn parse_index(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_lowercase)
        .collect()
}

/// 解析 `noun.exc`：每行是 `屈折形式 基本形式...`。
fn parse_exceptions(content: &str) -> Result<HashMap<String, Vec<String>>, CleanError> {
    let mut exceptions: HashMap<String, Vec<String>> = HashMap::new();
    for (line_idx, line) in content.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(inflected) = fields.next() else {
            continue;
        };
        let bases: Vec<String> = fields.map(str::to_lowercase).collect();
        if bases.is_empty() {
            return Err(CleanError::InvalidLexicon(format!(
                "不规则变化表第 {} 行缺少基本形式: '{}'",
                line_idx + 1,
                line.trim()
            )));
        }
        exceptions
            .entry(inflected.to_lowercase())
            .or_default()
            .extend(bases);
    }
    Ok(exceptions)
}
