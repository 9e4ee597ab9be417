use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use text_cleaner::{
    BatchJob, BatchOptions, DEFAULT_COLUMNS, DEFAULT_INPUT_TEMPLATE, DEFAULT_OUTPUT_TEMPLATE,
    Stopwords, TextNormalizer, WordNetLemmatizer, run_batch,
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 显式指定任务，格式为 `输入=输出`，可重复。指定后忽略模板与序号参数
    #[arg(long = "job", value_name = "INPUT=OUTPUT", value_parser = parse_job)]
    jobs: Vec<BatchJob>,

    /// 输入文件名模板，`{i}` 会被替换为序号
    #[arg(long, default_value = DEFAULT_INPUT_TEMPLATE)]
    input_template: String,

    /// 输出文件名模板，`{i}` 会被替换为序号
    #[arg(long, default_value = DEFAULT_OUTPUT_TEMPLATE)]
    output_template: String,

    /// 起始序号（包含）
    #[arg(long, default_value_t = 1)]
    first: u32,

    /// 结束序号（包含）
    #[arg(long, default_value_t = 5)]
    last: u32,

    /// 需要清洗的列名，可重复
    #[arg(long = "column", value_name = "NAME", default_values = DEFAULT_COLUMNS)]
    columns: Vec<String>,

    /// 读取的工作表名，默认使用第一个工作表
    #[arg(long)]
    sheet: Option<String>,

    /// 停用词文件（每行一个词），默认使用内置英文停用词表
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// WordNet 词典目录（包含 index.noun 与 noun.exc）或 NLTK 的 wordnet.zip。
    /// 未指定时在 $WNSEARCHDIR、$NLTK_DATA、~/nltk_data 等位置查找，都找不到才使用内置精简词表
    #[arg(long, value_name = "PATH")]
    wordnet_dir: Option<PathBuf>,

    /// 在多个文件之间并行处理
    #[arg(long)]
    parallel: bool,
}

fn parse_job(s: &str) -> Result<BatchJob, String> {
    s.parse::<BatchJob>().map_err(|e| e.to_string())
}

impl Args {
    fn into_options(self) -> anyhow::Result<BatchOptions> {
        let jobs = if self.jobs.is_empty() {
            anyhow::ensure!(
                self.first <= self.last,
                "起始序号 {} 大于结束序号 {}",
                self.first,
                self.last
            );
            (self.first..=self.last)
                .map(|i| BatchJob::from_templates(&self.input_template, &self.output_template, i))
                .collect()
        } else {
            self.jobs
        };
        anyhow::ensure!(!self.columns.is_empty(), "至少需要指定一个列名");

        Ok(BatchOptions {
            jobs,
            columns: self.columns,
            sheet: self.sheet,
            parallel: self.parallel,
        })
    }
}

fn load_lemmatizer(wordnet_path: Option<&Path>) -> anyhow::Result<WordNetLemmatizer> {
    if let Some(path) = wordnet_path {
        return WordNetLemmatizer::from_wordnet_path(path)
            .with_context(|| format!("无法加载 WordNet 词典 {path:?}"));
    }

    match WordNetLemmatizer::discover().context("找到了 WordNet 词典但无法加载")? {
        Some((lemmatizer, path)) => {
            log::info!("使用 WordNet 词典 {path:?}");
            Ok(lemmatizer)
        }
        None => {
            log::warn!("未找到 WordNet 词典，使用内置的精简名词词表进行词形还原");
            WordNetLemmatizer::bundled().context("内置名词词表损坏")
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let t = Instant::now();

    // --- 1. 加载语言资源 ---
    let stopwords = match &args.stopwords {
        Some(path) => Stopwords::from_file(path)
            .with_context(|| format!("无法加载停用词文件 {path:?}"))?,
        None => Stopwords::english(),
    };
    let lemmatizer = load_lemmatizer(args.wordnet_dir.as_deref())?;
    log::info!(
        "已加载 {} 个停用词，{} 个名词词条",
        stopwords.len(),
        lemmatizer.noun_count()
    );

    // --- 2. 整理任务 ---
    let options = args.into_options()?;
    for job in &options.jobs {
        log::debug!("任务: {job}");
    }

    // --- 3. 执行批处理 ---
    let normalizer = TextNormalizer::new(&stopwords, &lemmatizer);
    run_batch(&options, &normalizer).context("批处理中止")?;

    log::info!("处理成功！耗时: {:?}", t.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_match_default_options() {
        let args = Args::parse_from(["text_cleaner"]);
        assert_eq!(args.into_options().unwrap(), BatchOptions::default());
    }

    #[test]
    fn test_explicit_jobs_and_columns() {
        let args = Args::parse_from([
            "text_cleaner",
            "--job",
            "a.xlsx=a.json",
            "--job",
            "b.csv=b.json",
            "--column",
            "Abstract",
            "--parallel",
        ]);
        let options = args.into_options().unwrap();
        assert_eq!(
            options.jobs,
            vec![BatchJob::new("a.xlsx", "a.json"), BatchJob::new("b.csv", "b.json")]
        );
        assert_eq!(options.columns, vec!["Abstract"]);
        assert!(options.parallel);
    }

    #[test]
    fn test_template_range() {
        let args = Args::parse_from([
            "text_cleaner",
            "--input-template",
            "in/{i}.csv",
            "--output-template",
            "out/{i}.json",
            "--first",
            "3",
            "--last",
            "4",
        ]);
        let options = args.into_options().unwrap();
        assert_eq!(
            options.jobs,
            vec![
                BatchJob::new("in/3.csv", "out/3.json"),
                BatchJob::new("in/4.csv", "out/4.json")
            ]
        );
    }

    #[test]
    fn test_invalid_arguments() {
        let args = Args::parse_from(["text_cleaner", "--first", "5", "--last", "1"]);
        assert!(args.into_options().is_err());

        assert!(Args::try_parse_from(["text_cleaner", "--job", "no-separator"]).is_err());
    }

    #[test]
    fn test_explicit_wordnet_path_overrides_discovery() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.noun"), "patient n 1\n").unwrap();
        std::fs::write(dir.path().join("noun.exc"), "").unwrap();

        let lemmatizer = load_lemmatizer(Some(dir.path())).unwrap();
        assert_eq!(lemmatizer.noun_count(), 1);

        assert!(load_lemmatizer(Some(&dir.path().join("missing"))).is_err());
    }
}
