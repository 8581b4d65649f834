// Built-in sample passages for quick manual checks (`styloscope --samples`).

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleText {
    pub label: &'static str,
    pub text: &'static str,
}

pub const SAMPLE_TEXTS: [SampleText; 3] = [
    SampleText {
        label: "AI generated: research summary",
        text: "Artificial intelligence detectors analyze word choice, rhythm, and structure \
               to guess whether a paragraph was crafted by software. The systems compare \
               thousands of previous examples, extract stylometric signals, and output a \
               confidence score that educators can review alongside their own judgement.",
    },
    SampleText {
        label: "Human written: travel diary",
        text: "我在花東縱谷騎腳踏車時被午後雷陣雨嚇了一跳，索性躲進路邊小書店。店長端來熱茶，\
               我們聊起他收藏的二手詩集，等到雨停才發現天色整個被晚霞染成粉橘色。",
    },
    SampleText {
        label: "Human written: opinion snippet",
        text: "The class discussion felt messy but alive. People interrupted each other, \
               changed their minds mid-sentence, and even abandoned examples halfway through. \
               That jagged energy is the opposite of the tidy, polished voice I'm used to from chatbots.",
    },
];
