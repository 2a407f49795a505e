//! Semantic resource categories.
//!
//! Resource types are matched against an ordered prefix table; the first
//! matching prefix wins, so specific EC2 networking types are listed before
//! the catch-all `AWS::EC2::` compute rule.

/// Category for types no rule matches.
pub const DEFAULT_CATEGORY: &str = "Other";

/// `(type prefix, category)` pairs, checked in order.
pub const CATEGORY_RULES: &[(&str, &str)] = &[
    ("AWS::EC2::VPC", "Networking"),
    ("AWS::EC2::Subnet", "Networking"),
    ("AWS::EC2::Route", "Networking"),
    ("AWS::EC2::InternetGateway", "Networking"),
    ("AWS::EC2::NatGateway", "Networking"),
    ("AWS::EC2::EIP", "Networking"),
    ("AWS::EC2::NetworkAcl", "Networking"),
    ("AWS::EC2::NetworkInterface", "Networking"),
    ("AWS::EC2::TransitGateway", "Networking"),
    ("AWS::EC2::VPNGateway", "Networking"),
    ("AWS::EC2::CustomerGateway", "Networking"),
    ("AWS::EC2::DHCPOptions", "Networking"),
    ("AWS::EC2::SecurityGroup", "Security"),
    ("AWS::KMS::", "Security"),
    ("AWS::SecretsManager::", "Security"),
    ("AWS::WAF", "Security"),
    ("AWS::CertificateManager::", "Security"),
    ("AWS::IAM::", "IAM"),
    ("AWS::Lambda::", "Compute"),
    ("AWS::EC2::", "Compute"),
    ("AWS::AutoScaling::", "Compute"),
    ("AWS::ECS::", "Compute"),
    ("AWS::EKS::", "Compute"),
    ("AWS::Batch::", "Compute"),
    ("AWS::RDS::", "Database"),
    ("AWS::DynamoDB::", "Database"),
    ("AWS::ElastiCache::", "Database"),
    ("AWS::Neptune::", "Database"),
    ("AWS::DocDB::", "Database"),
    ("AWS::Redshift::", "Database"),
    ("AWS::S3::", "Storage"),
    ("AWS::EFS::", "Storage"),
    ("AWS::FSx::", "Storage"),
    ("AWS::SQS::", "Messaging"),
    ("AWS::SNS::", "Messaging"),
    ("AWS::Events::", "Messaging"),
    ("AWS::Kinesis::", "Messaging"),
    ("AWS::StepFunctions::", "Messaging"),
    ("AWS::ApiGateway", "Api"),
    ("AWS::ElasticLoadBalancing", "Api"),
    ("AWS::CloudFront::", "Api"),
    ("AWS::Route53::", "Api"),
    ("AWS::AppSync::", "Api"),
    ("AWS::CloudWatch::", "Monitoring"),
    ("AWS::Logs::", "Monitoring"),
    ("Custom::", "Custom"),
    ("AWS::CloudFormation::CustomResource", "Custom"),
];

/// Category of a resource type.
pub fn categorize(resource_type: &str) -> &'static str {
    CATEGORY_RULES
        .iter()
        .find(|(prefix, _)| resource_type.starts_with(prefix))
        .map_or(DEFAULT_CATEGORY, |(_, category)| category)
}

/// Position of a category in table order; [`DEFAULT_CATEGORY`] sorts last.
pub fn category_rank(category: &str) -> usize {
    CATEGORY_RULES
        .iter()
        .position(|(_, c)| *c == category)
        .unwrap_or(CATEGORY_RULES.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_prefix_wins() {
        assert_eq!(categorize("AWS::EC2::VPC"), "Networking");
        assert_eq!(categorize("AWS::EC2::VPCGatewayAttachment"), "Networking");
        assert_eq!(categorize("AWS::EC2::SubnetRouteTableAssociation"), "Networking");
        assert_eq!(categorize("AWS::EC2::SecurityGroupIngress"), "Security");
        assert_eq!(categorize("AWS::EC2::Instance"), "Compute");
        assert_eq!(categorize("AWS::IAM::Role"), "IAM");
        assert_eq!(categorize("AWS::ApiGatewayV2::Api"), "Api");
        assert_eq!(categorize("Custom::Seeder"), "Custom");
    }

    #[test]
    fn test_unmatched_falls_back() {
        assert_eq!(categorize("AWS::Glue::Job"), DEFAULT_CATEGORY);
        assert_eq!(category_rank(DEFAULT_CATEGORY), CATEGORY_RULES.len());
    }

    #[test]
    fn test_rank_follows_table() {
        assert!(category_rank("Networking") < category_rank("Security"));
        assert!(category_rank("IAM") < category_rank("Compute"));
    }
}
