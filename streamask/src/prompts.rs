//! Prompt modes and their templates.
//!
//! Each template carries a `{query_text}` placeholder that is replaced with
//! the user's query verbatim.

const PLACEHOLDER: &str = "{query_text}";

pub const DEFAULT_MODE: &str = "explain";

/// A selectable prompt mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptMode {
    pub id: &'static str,
    template: &'static str,
}

impl PromptMode {
    /// Render the template for a query.
    pub fn render(&self, query: &str) -> String {
        self.template.replace(PLACEHOLDER, query)
    }
}

pub const PROMPT_MODES: &[PromptMode] = &[
    PromptMode { id: "explain", template: EXPLAIN },
    PromptMode { id: "deep_explain", template: DEEP_EXPLAIN },
    PromptMode { id: "critical_think", template: CRITICAL_THINK },
    PromptMode { id: "translate", template: TRANSLATE },
    PromptMode { id: "movie_summary", template: MOVIE_SUMMARY },
    PromptMode { id: "custom_prompt", template: PLACEHOLDER },
];

/// Look up a mode by id.
pub fn find_mode(id: &str) -> Option<&'static PromptMode> {
    PROMPT_MODES.iter().find(|mode| mode.id == id)
}

const EXPLAIN: &str = r#"请用最简单、最接地气、普通人一听就能明白的大白话，解释一下 '{query_text}' 到底是什么意思。
你就把我当成一个完全不懂这方面知识的小学生或老奶奶来解释。
如果可以的话，尽量用一个生活中的例子或者打个比方，帮助我理解。
解释的时候，力求准确，但千万别用那些文绉绉或者太专业的词儿。"#;

const DEEP_EXPLAIN: &str = r#"请帮我用大白话深度解读以下内容：
'{query_text}'"#;

const CRITICAL_THINK: &str = r#"请针对 '{query_text}' 这个主题或说法，用最大白话、最容易懂的简体中文进行批判性思考。请尝试从下面几个方面帮我分析分析（挑你觉得最合适的几个方面说就行，不用每个都说）：

1.  **它到底在说啥？** (核心观点/主要信息是什么？)
2.  **这么说有啥依据吗？** (支撑它的理由或证据可靠吗？充分吗？)
3.  **有没有啥没明说但暗含的意思？** (背后可能藏着什么假设或前提？)
4.  **有没有别的看法或角度？** (换个角度看会怎么样？有没有不同的声音？)
5.  **可能会有啥好的或不好的影响？** (长远来看会怎么样？)
6.  **我们应该怎么更全面地看待这事儿/这个说法？**

请把你的分析一点一点说清楚，用简单的词，别整那些难懂的。"#;

const TRANSLATE: &str = r#"请仔细分析用户提供的文本内容：'{query_text}'

首先，判断该内容更像是一个独立的单词/短语（适合查词并深入学习），还是一个完整的句子/段落（适合翻译并学习其中词汇）。

**情况一：如果内容判断为【单词或短语】进行学习：**
请提供该单词/短语的详细解释。
- 如果是中文内容，请给出：
    1.  拼音。
    2.  主要的几种英文释义（注明词性，最多3种）。
    3.  为每种主要英文释义提供一个中文例句及其对应的英文翻译。
- 如果是英文内容，请给出：
    1.  国际音标 (IPA, 如果你能准确提供)。
    2.  主要的几种简体中文释义（注明词性，最多3种）。
    3.  为每种主要中文释义提供一个英文例句及其对应的简体中文翻译。
- 如果是其他语言的单词/短语，请尝试识别其语言，并给出：
    1.  其在该语言中的发音提示（如果可能，例如罗马音）。
    2.  主要的几种简体中文释义（注明词性或用途，最多3种）。
    3.  为每种主要中文释义提供一个该语言的例句及其对应的简体中文翻译。

请严格按照以下 Markdown 格式组织回答 (以英文单词为例，其他语言和中文词语则对应调整各项内容)：

**查询内容：**
{query_text}

---
**类型：** 单词/短语学习
---

**发音：**
* [例如：səˌrɛnˈdɪpəti / こんにちは (Konnichiwa) / [中文拼音] ]

---

**详细释义：**

1.  **含义：**
    * **词性/用途：** [词性1/用途说明]
    * **解释 ([目标语言，通常为中文或英文])：** [解释1]
    * **例句 ([源语言])：** [Example sentence 1 in original language]
    * **例句翻译 ([目标语言])：** [Translation of example 1]

2.  **含义：**
    * **词性/用途：** [词性2/用途说明]
    * **解释 ([目标语言])：** [解释2]
    * **例句 ([源语言])：** [Example sentence 2 in original language]
    * **例句翻译 ([目标语言])：** [Translation of example 2]

(如果还有其他重要释义，请继续，总数不超过3条)

**情况二：如果内容判断为【句子或段落】进行翻译和学习：**
请分析输入文本的语言。
- 如果输入的是中文，请将其翻译成流畅自然的英文。
- 如果输入的是英文或其他可识别的非中文语言，请将其翻译成通顺易懂的简体中文。

翻译完成后，请从【原文】中挑选出2-3个对于学习者来说（学习目标语言或了解原文）可能不熟悉或值得重点学习的核心词汇。为这些词汇提供：
-   它们在原文中的形式。
-   它们在【目标翻译语言】中的简明解释（如果是中文词被翻译成英文后的生词学习，请提供拼音和英文解释；如果是外文词被翻译成中文后的生词学习，请提供原文发音提示（如罗马音）和中文解释）。

请严格按照以下 Markdown 格式组织回答 (以下示例为非中文原文翻译成简体中文，其他情况请AI灵活调整标签和内容)：

**原文 (例如：[检测到的语言，如日语])：**
{query_text}

---
**类型：** 句子/段落翻译与词汇学习
---

**翻译 (简体中文)：**
[此处为翻译后的简体中文内容]

---

**核心词汇学习 (来自原文)：**
* **[原文词1，例如：難しい]** (发音提示: [例如：muzukashī]): [该词在简体中文中的解释或对应表达，例如：困难的，不容易的]
* **[原文词2]** (发音提示: [发音]): [中文解释]
* **[原文词3]** (发音提示: [发音]): [中文解释]

---
**重要指示：请AI务必先做出明确的“类型”判断，并在输出中明确标示出所选的类型和检测到的源语言（如果适用）。如果输入内容非常简短且难以明确区分，请优先尝试按“情况一：单词或短语学习”处理，并努力识别其原始语言。**"#;

const MOVIE_SUMMARY: &str = r#"请查询电影《{query_text}》的详细信息，并严格按照以下 Markdown 格式进行排版输出：

**电影名称：** 《{query_text}》

---

**剧情简介 (100字以内)：**
[此处填写控制在100字以内的剧情简介，避免剧透关键情节]

---

**核心信息：**
* **导演：** [此处填写导演名]
* **主要演员：** [此处填写主要演员列表，用逗号分隔]
* **上映年份：** [此处填写上映年份，如XXXX年]
* **豆瓣评分：** [此处填写豆瓣评分，例如：8.5/10；如果暂无评分，请注明“暂无评分”或“信息待更新”]

---

**额外信息 (如果方便获取)：**
* **类型：** [此处填写电影类型，如：剧情 / 动作 / 科幻]
* **制片国家/地区：** [此处填写制片国家或地区]
* **片长：** [此处填写电影片长]

**请确保剧情简介简洁明了，不超过100字。如果某项核心信息确实无法找到，请在该项后注明“信息暂缺”。**"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_has_placeholder() {
        for mode in PROMPT_MODES {
            assert!(mode.template.contains(PLACEHOLDER), "{} lacks placeholder", mode.id);
        }
    }

    #[test]
    fn explain_renders_query() {
        let prompt = find_mode("explain").unwrap().render("黑洞");
        assert!(prompt.contains("'黑洞'"));
        assert!(!prompt.contains(PLACEHOLDER));
    }

    #[test]
    fn movie_summary_replaces_every_occurrence() {
        let prompt = find_mode("movie_summary").unwrap().render("星际穿越");
        assert_eq!(prompt.matches("《星际穿越》").count(), 2);
    }

    #[test]
    fn custom_prompt_is_verbatim() {
        assert_eq!(find_mode("custom_prompt").unwrap().render("hello {x}"), "hello {x}");
    }

    #[test]
    fn unknown_mode_is_none() {
        assert!(find_mode("poetry").is_none());
        assert!(find_mode(DEFAULT_MODE).is_some());
    }
}
