//! Read-only topic/question catalog, ordered for sequencing and unlock lookups.

use std::collections::{HashMap, HashSet};

use tracing::{error, info};

use crate::domain::{Question, QuestionId, Topic, TopicId};

#[derive(Debug, Default)]
pub struct Curriculum {
    /// Sorted by `order`; orders are unique.
    topics: Vec<Topic>,
    questions: HashMap<QuestionId, Question>,
    /// Question ids per topic, sorted by question `order`.
    by_topic: HashMap<TopicId, Vec<QuestionId>>,
}

impl Curriculum {
    /// Build the catalog. Entries with a duplicate id, a duplicate topic order or
    /// an unknown topic are logged and skipped.
    pub fn new(topics: Vec<Topic>, questions: Vec<Question>) -> Self {
        let mut kept_topics: Vec<Topic> = Vec::with_capacity(topics.len());
        let mut seen_orders = HashSet::new();
        for t in topics {
            if kept_topics.iter().any(|k| k.id == t.id) {
                error!(target: "pylearn_backend", topic_id = t.id, "Skipping topic: duplicate id");
                continue;
            }
            if !seen_orders.insert(t.order) {
                error!(target: "pylearn_backend", topic_id = t.id, order = t.order, "Skipping topic: duplicate order");
                continue;
            }
            kept_topics.push(t);
        }
        kept_topics.sort_by_key(|t| t.order);

        let mut by_id = HashMap::<QuestionId, Question>::new();
        for q in questions {
            if !kept_topics.iter().any(|t| t.id == q.topic_id) {
                error!(target: "pylearn_backend", question_id = q.id, topic_id = q.topic_id, "Skipping question: unknown topic");
                continue;
            }
            if by_id.contains_key(&q.id) {
                error!(target: "pylearn_backend", question_id = q.id, "Skipping question: duplicate id");
                continue;
            }
            by_id.insert(q.id, q);
        }

        let mut by_topic = HashMap::<TopicId, Vec<QuestionId>>::new();
        for q in by_id.values() {
            by_topic.entry(q.topic_id).or_default().push(q.id);
        }
        for ids in by_topic.values_mut() {
            ids.sort_by_key(|id| (by_id[id].order, *id));
        }

        info!(target: "pylearn_backend", topics = kept_topics.len(), questions = by_id.len(), "Curriculum loaded");
        Self { topics: kept_topics, questions: by_id, by_topic }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    pub fn questions_in(&self, topic: TopicId) -> Vec<&Question> {
        self.by_topic
            .get(&topic)
            .map(|ids| ids.iter().filter_map(|id| self.questions.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn question_count(&self, topic: TopicId) -> usize {
        self.by_topic.get(&topic).map_or(0, Vec::len)
    }

    pub fn question_total(&self) -> usize {
        self.questions.len()
    }

    /// The topic every learner starts with (lowest order).
    pub fn entry_topic(&self) -> Option<&Topic> {
        self.topics.first()
    }

    /// Linear successor: the topic with the smallest order strictly above `order`.
    pub fn next_topic_after(&self, order: i32) -> Option<&Topic> {
        self.topics.iter().find(|t| t.order > order)
    }
}
