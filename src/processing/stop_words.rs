//! Built-in stop-word lists (lemma forms). Extended from config at runtime.

/// Russian pronouns, determiners and filler adverbs.
pub const RUSSIAN: &[&str] = &[
    "это", "так", "как", "то", "все", "всё", "он", "она", "оно", "они", "мы", "вы", "я", "ты",
    "мой", "твой", "наш", "ваш", "его", "ее", "её", "их", "себя", "кто", "что", "какой",
    "чей", "где", "куда", "откуда", "когда", "почему", "зачем", "сколько", "столько", "тот",
    "этот", "такой", "сей", "всякий", "каждый", "любой", "иной", "другой", "сам", "самый",
    "весь", "вот", "вон", "тут", "там", "здесь", "туда", "сюда", "оттуда", "отсюда", "теперь",
    "сейчас", "потом", "тогда", "всегда", "никогда", "иногда", "часто", "редко", "очень",
    "слишком", "почти", "примерно", "точно", "именно", "просто", "только", "лишь", "даже",
    "уже", "еще", "ещё", "для", "при", "или", "чтобы", "если", "быть", "есть", "был", "была",
    "было", "были", "над", "под", "без", "через", "про",
];

/// English function words and chat filler.
pub const ENGLISH: &[&str] = &[
    "the", "and", "but", "for", "with", "are", "was", "were", "been", "being", "have", "has",
    "had", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "this", "that", "these", "those", "you", "she", "they", "him", "her", "them",
    "your", "his", "its", "our", "their", "what", "which", "who", "whom", "when", "where",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some",
    "such", "nor", "not", "only", "own", "same", "than", "too", "very", "just", "also", "now",
    "here", "there", "then", "once", "because", "until", "while", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "from",
    "out", "off", "over", "under", "again", "further", "any", "yes", "yeah", "okay", "sure",
    "really", "actually", "well", "please", "thanks", "thank", "lol", "hey", "hello",
];
