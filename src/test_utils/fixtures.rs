//! Ready-made templates shared by unit and integration tests.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

use super::builder::TemplateBuilder;
use crate::template::Template;

/// Named template fixture.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    pub name: String,
    pub builder: TemplateBuilder,
}

impl TemplateFixture {
    /// Network, role, and a function reading the role's ARN.
    ///
    /// Subnet references Vpc; Function reads `Role.Arn` and logs to a group
    /// gated on `EnableLogs`.
    pub fn web_service() -> Self {
        let builder = TemplateBuilder::new()
            .description("Web service")
            .parameter("Env", "String")
            .resource("Vpc", "AWS::EC2::VPC")
            .resource("Subnet", "AWS::EC2::Subnet")
            .with_ref("Subnet", "VpcId", "Vpc")
            .resource("Role", "AWS::IAM::Role")
            .resource("Function", "AWS::Lambda::Function")
            .with_get_att("Function", "Role", "Role", "Arn")
            .property(
                "Function",
                "Environment",
                json!({ "Variables": { "STAGE": { "Ref": "Env" } } }),
            )
            .output("FunctionArn", json!({ "Fn::GetAtt": ["Function", "Arn"] }));
        Self {
            name: "web_service".into(),
            builder,
        }
    }

    /// Two queues whose policies reference each other in a loop.
    pub fn with_cycle() -> Self {
        let builder = TemplateBuilder::new()
            .resource("QueueA", "AWS::SQS::Queue")
            .resource("QueueB", "AWS::SQS::Queue")
            .with_ref("QueueA", "RedriveTarget", "QueueB")
            .with_ref("QueueB", "RedriveTarget", "QueueA")
            .resource("Topic", "AWS::SNS::Topic")
            .with_get_att("Topic", "QueueArn", "QueueA", "Arn");
        Self {
            name: "with_cycle".into(),
            builder,
        }
    }

    /// A larger template spanning several categories, with a cycle, a
    /// condition, repeated types, and explicit `DependsOn`.
    pub fn large_application() -> Self {
        let mut builder = TemplateBuilder::new()
            .description("Shop")
            .parameter("Env", "String")
            .parameter("DomainName", "String")
            .resource("Vpc", "AWS::EC2::VPC")
            .resources("Subnet", "AWS::EC2::Subnet", 3)
            .resource("SecurityGroup", "AWS::EC2::SecurityGroup")
            .with_ref("SecurityGroup", "VpcId", "Vpc")
            .resource("ApiRole", "AWS::IAM::Role")
            .resource("WorkerRole", "AWS::IAM::Role")
            .resource("Table", "AWS::DynamoDB::Table")
            .resource("Bucket", "AWS::S3::Bucket")
            .resource("Queue", "AWS::SQS::Queue")
            .resource("DeadLetter", "AWS::SQS::Queue")
            .with_ref("Queue", "DeadLetterTarget", "DeadLetter")
            .with_ref("DeadLetter", "SourceQueue", "Queue")
            .resource("Api", "AWS::Lambda::Function")
            .with_get_att("Api", "Role", "ApiRole", "Arn")
            .with_ref("Api", "TableName", "Table")
            .with_ref("Api", "SecurityGroup", "SecurityGroup")
            .resource("Worker", "AWS::Lambda::Function")
            .with_get_att("Worker", "Role", "WorkerRole", "Arn")
            .with_get_att("Worker", "QueueArn", "Queue", "Arn")
            .with_ref("Worker", "Bucket", "Bucket")
            .resource("Alarm", "AWS::CloudWatch::Alarm")
            .with_ref("Alarm", "Function", "Worker")
            .condition("Alarm", "IsProd")
            .resource("Dashboard", "AWS::CloudWatch::Dashboard")
            .condition("Dashboard", "IsProd")
            .depends_on("Dashboard", "Alarm")
            .output("ApiArn", json!({ "Fn::GetAtt": ["Api", "Arn"] }))
            .output("BucketName", json!({ "Ref": "Bucket" }));
        for i in 1..=3 {
            builder = builder.with_ref(&format!("Subnet{i}"), "VpcId", "Vpc");
        }
        Self {
            name: "large_application".into(),
            builder,
        }
    }

    pub fn build(&self) -> Template {
        self.builder.build()
    }

    /// Write the fixture as `<name>.json` under `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.name));
        let text = serde_json::to_string_pretty(&self.builder.to_value())?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    /// Write the fixture as `<name>.yaml` under `dir`.
    pub fn write_yaml(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.yaml", self.name));
        let text = serde_yaml::to_string(&self.builder.to_value())?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}
