use crate::error::Result;
use crate::models::{
    format_score, Evaluation, EvaluationPatch, EvaluationsUpdate, NewEvaluation, SubjectWithTopics,
    TopicCompletion,
};
use crate::services::{Query, RestClient};

const SUBJECTS: &str = "subjects";
const TOPICS: &str = "topics";
const WITH_TOPICS: &str = "*,topics(*)";

/// One selectable line of the dashboard, as indices into `subjects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRow {
    Subject(usize),
    Topic(usize, usize),
    Evaluation(usize, usize),
}

impl DashboardRow {
    pub fn subject_index(&self) -> usize {
        match *self {
            DashboardRow::Subject(s)
            | DashboardRow::Topic(s, _)
            | DashboardRow::Evaluation(s, _) => s,
        }
    }
}

/// Every subject with its topics and evaluations in one read.
///
/// Mutations here refetch the whole collection afterwards instead of
/// patching local state.
pub struct DashboardView {
    pub subjects: Vec<SubjectWithTopics>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            subjects: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// Average score for display, or `None` when the subject has no evaluations.
    pub fn average_label(subject: &SubjectWithTopics) -> Option<String> {
        subject.subject.average_score().map(format_score)
    }

    /// Subjects in display order, each followed by its topics and then its evaluations.
    pub fn rows(&self) -> Vec<DashboardRow> {
        let mut rows = Vec::new();
        for (s, subject) in self.subjects.iter().enumerate() {
            rows.push(DashboardRow::Subject(s));
            rows.extend((0..subject.topics.len()).map(|t| DashboardRow::Topic(s, t)));
            rows.extend(
                (0..subject.subject.evaluations.len()).map(|e| DashboardRow::Evaluation(s, e)),
            );
        }
        rows
    }

    pub async fn fetch_all(&mut self, rest: &RestClient) {
        if let Err(e) = self.refetch(rest).await {
            tracing::error!("Error fetching dashboard data: {}", e);
            self.error = Some("Falha ao carregar dados".to_string());
        }
        self.loading = false;
    }

    async fn refetch(&mut self, rest: &RestClient) -> Result<()> {
        let query = Query::table(SUBJECTS)
            .select(WITH_TOPICS)
            .order("created_at", false);
        self.subjects = rest.select(&query).await?;
        Ok(())
    }

    pub async fn toggle_topic(&mut self, rest: &RestClient, topic_id: &str) {
        let Some(current) = self
            .subjects
            .iter()
            .flat_map(|s| s.topics.iter())
            .find(|t| t.id == topic_id)
            .map(|t| t.completed)
        else {
            return;
        };

        let update = TopicCompletion {
            completed: !current,
        };
        let result = async {
            rest.update(TOPICS, topic_id, &update).await?;
            self.refetch(rest).await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Error updating topic {}: {}", topic_id, e);
            self.error = Some("Falha ao atualizar status do tópico".to_string());
        }
    }

    /// Merge `patch` into one evaluation and write the subject's whole
    /// collection back. Concurrent editors overwrite each other.
    pub async fn update_evaluation(
        &mut self,
        rest: &RestClient,
        subject_id: &str,
        evaluation_id: &str,
        patch: EvaluationPatch,
    ) {
        let Some(subject) = self.subjects.iter().find(|s| s.subject.id == subject_id) else {
            return;
        };
        let mut evaluations = subject.subject.evaluations.clone();
        let Some(evaluation) = evaluations.iter_mut().find(|e| e.id == evaluation_id) else {
            return;
        };
        evaluation.apply(&patch);

        if let Err(e) = self.write_evaluations(rest, subject_id, &evaluations).await {
            tracing::error!("Error updating evaluation {}: {}", evaluation_id, e);
            self.error = Some("Falha ao atualizar avaliação".to_string());
        }
    }

    /// Append a new evaluation to a subject. Returns whether it was stored.
    pub async fn add_evaluation(
        &mut self,
        rest: &RestClient,
        subject_id: &str,
        date: &str,
        score: &str,
    ) -> bool {
        let new_evaluation = match NewEvaluation::parse(date, score) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                self.error = Some(e.to_string());
                return false;
            }
        };
        let Some(subject) = self.subjects.iter().find(|s| s.subject.id == subject_id) else {
            return false;
        };

        let mut evaluations = subject.subject.evaluations.clone();
        evaluations.push(new_evaluation.into_evaluation());

        match self.write_evaluations(rest, subject_id, &evaluations).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error adding evaluation to {}: {}", subject_id, e);
                self.error = Some("Falha ao adicionar avaliação".to_string());
                false
            }
        }
    }

    async fn write_evaluations(
        &mut self,
        rest: &RestClient,
        subject_id: &str,
        evaluations: &[Evaluation],
    ) -> Result<()> {
        rest.update(SUBJECTS, subject_id, &EvaluationsUpdate { evaluations })
            .await?;
        self.refetch(rest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{rest, topic_json};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(evaluations: serde_json::Value, topics: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "id": "s1",
            "user_id": "u1",
            "title": "Cálculo",
            "evaluations": evaluations,
            "created_at": "2024-03-01T12:00:00+00:00",
            "topics": topics
        })
    }

    async fn mount_rows(server: &MockServer, rows: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/subjects"))
            .and(query_param("select", "*,topics(*)"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn averages_are_shown_only_when_present() {
        let server = MockServer::start().await;
        let mut empty = row(serde_json::json!(null), vec![]);
        empty["id"] = serde_json::json!("s2");
        mount_rows(
            &server,
            vec![
                row(
                    serde_json::json!([
                        {"id": "e1", "date": "2024-04-01", "score": 8.0, "completed": true},
                        {"id": "e2", "date": "2024-05-01", "score": 6.0, "completed": false}
                    ]),
                    vec![],
                ),
                empty,
            ],
        )
        .await;

        let mut view = DashboardView::new();
        view.fetch_all(&rest(&server)).await;
        assert!(!view.loading);
        assert_eq!(view.subjects.len(), 2);
        assert_eq!(DashboardView::average_label(&view.subjects[0]).as_deref(), Some("7.0"));
        assert_eq!(DashboardView::average_label(&view.subjects[1]), None);
    }

    #[test]
    fn rows_list_topics_before_evaluations() {
        let rows = vec![
            row(
                serde_json::json!([{"id": "e1", "date": "2024-04-01", "score": 5.0, "completed": false}]),
                vec![topic_json("t1", "s1", "Limites", false)],
            ),
            row(serde_json::json!([]), vec![]),
        ];
        let view = DashboardView {
            subjects: serde_json::from_value(serde_json::Value::Array(rows)).unwrap(),
            loading: false,
            error: None,
        };
        assert_eq!(
            view.rows(),
            vec![
                DashboardRow::Subject(0),
                DashboardRow::Topic(0, 0),
                DashboardRow::Evaluation(0, 0),
                DashboardRow::Subject(1),
            ]
        );
        assert_eq!(DashboardRow::Evaluation(0, 0).subject_index(), 0);
    }

    #[tokio::test]
    async fn evaluation_update_writes_whole_collection_then_refetches() {
        let server = MockServer::start().await;
        let evaluations = serde_json::json!([
            {"id": "e1", "date": "2024-04-01", "score": 8.0, "completed": false},
            {"id": "e2", "date": "2024-05-01", "score": 6.0, "completed": false}
        ]);
        mount_rows(&server, vec![row(evaluations, vec![])]).await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/subjects"))
            .and(query_param("id", "eq.s1"))
            .and(body_json(serde_json::json!({
                "evaluations": [
                    {"id": "e1", "date": "2024-04-01", "score": 8.0, "completed": false},
                    {"id": "e2", "date": "2024-05-01", "score": 9.5, "completed": false}
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = DashboardView::new();
        view.fetch_all(&rest).await;
        view.update_evaluation(
            &rest,
            "s1",
            "e2",
            EvaluationPatch {
                score: Some(9.5),
                ..Default::default()
            },
        )
        .await;
        assert!(view.error.is_none());

        let requests = server.received_requests().await.unwrap();
        let gets = requests.iter().filter(|r| r.method.as_str() == "GET").count();
        assert_eq!(gets, 2);
    }

    #[tokio::test]
    async fn unknown_evaluation_is_a_no_op() {
        let server = MockServer::start().await;
        mount_rows(&server, vec![row(serde_json::json!([]), vec![])]).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = DashboardView::new();
        view.fetch_all(&rest).await;
        view.update_evaluation(&rest, "s1", "missing", EvaluationPatch::default())
            .await;
        view.update_evaluation(&rest, "other", "e1", EvaluationPatch::default())
            .await;
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn toggle_topic_patches_and_refetches() {
        let server = MockServer::start().await;
        mount_rows(
            &server,
            vec![row(
                serde_json::json!([]),
                vec![topic_json("t1", "s1", "Limites", true)],
            )],
        )
        .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/topics"))
            .and(query_param("id", "eq.t1"))
            .and(body_json(serde_json::json!({"completed": false})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = DashboardView::new();
        view.fetch_all(&rest).await;
        view.toggle_topic(&rest, "t1").await;
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn new_evaluation_is_appended_and_validated() {
        let server = MockServer::start().await;
        mount_rows(&server, vec![row(serde_json::json!([]), vec![])]).await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/subjects"))
            .and(query_param("id", "eq.s1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = DashboardView::new();
        view.fetch_all(&rest).await;

        assert!(!view.add_evaluation(&rest, "s1", "2024-06-01", "11").await);
        assert_eq!(view.error.as_deref(), Some("A nota deve estar entre 0 e 10"));

        view.error = None;
        assert!(view.add_evaluation(&rest, "s1", "2024-06-01", "7.5").await);

        let requests = server.received_requests().await.unwrap();
        let patch = requests
            .iter()
            .find(|r| r.method.as_str() == "PATCH")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
        let stored = &body["evaluations"][0];
        assert_eq!(stored["date"], "2024-06-01");
        assert_eq!(stored["score"], 7.5);
        assert_eq!(stored["completed"], false);
    }

    #[tokio::test]
    async fn failed_write_sets_banner() {
        let server = MockServer::start().await;
        mount_rows(
            &server,
            vec![row(
                serde_json::json!([{"id": "e1", "date": "2024-04-01", "score": 8.0, "completed": false}]),
                vec![],
            )],
        )
        .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = DashboardView::new();
        view.fetch_all(&rest).await;
        view.update_evaluation(
            &rest,
            "s1",
            "e1",
            EvaluationPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(view.error.as_deref(), Some("Falha ao atualizar avaliação"));
    }
}
